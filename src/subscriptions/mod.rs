//! Subscription index
//!
//! The bidirectional mapping between sessions and channels. A subscription
//! is one record whose primary key names the channel and whose range key
//! names the session; the swapped-key secondary index makes the same
//! record set scannable from the session side. There is no separate
//! membership structure to keep in sync — the two listings are two
//! projections of one relation.

pub mod index;

pub use index::SubscriptionIndex;
