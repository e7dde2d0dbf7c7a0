//! Keyed store contract and in-memory backend
//!
//! All relay state lives in one external keyed table: subscription rows and
//! message rows share it, disambiguated by the type prefixes of the `keys`
//! module. The store exposes point writes, conditional-free deletes, an
//! ordered prefix scan, and the same scan shape over a secondary index with
//! key and range swapped. Mutations additionally surface on an asynchronous
//! change feed, ordered per key and delivered at least once.
//!
//! # Architecture
//!
//! ```text
//!                    Arc<dyn KeyedStore>
//!               ┌───────────────────────────┐
//!               │ (pk, sk) -> fields        │
//!               │                           │
//!               │  CHANNEL|General ─┬─ SESSION|A      subscription rows
//!               │                   ├─ SESSION|B
//!               │                   └─ MESSAGE|17...  message rows
//!               └─────────┬─────────────────┘
//!                         │ every put/delete
//!                         ▼
//!                  ChangeRecord feed ──► ChangeFeedReactor
//! ```
//!
//! The production store is an external collaborator; [`MemoryStore`] is the
//! in-process implementation used by the test suite and by embedders that
//! do not need durability.

pub mod keyed;
pub mod memory;
pub mod record;

pub use keyed::KeyedStore;
pub use memory::MemoryStore;
pub use record::{ChangeKind, ChangeRecord, Record};
