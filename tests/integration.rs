//! End-to-end relay scenarios
//!
//! Drives the full loop: lifecycle and actions mutate the in-memory store,
//! the store's change feed is pumped into the reactor by hand (standing in
//! for the platform's stream delivery), and deliveries are observed on a
//! recording transport.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chat_relay::{
    BasicSanitizer, ChangeRecord, Event, KeyedStore, MemoryStore, PushError, Record, Relay,
    RelayConfig, Transport,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// Transport double that decodes pushed payloads back into events
#[derive(Default)]
struct TestTransport {
    events: Mutex<Vec<(String, Event)>>,
    unreachable: Mutex<HashSet<String>>,
}

impl TestTransport {
    fn events(&self) -> Vec<(String, Event)> {
        self.events.lock().unwrap().clone()
    }

    fn events_for(&self, session_id: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|(id, _)| id == session_id)
            .map(|(_, event)| event)
            .collect()
    }

    fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn mark_unreachable(&self, session_id: &str) {
        self.unreachable
            .lock()
            .unwrap()
            .insert(session_id.to_string());
    }
}

#[async_trait]
impl Transport for TestTransport {
    async fn push(&self, session_id: &str, payload: Bytes) -> Result<(), PushError> {
        if self.unreachable.lock().unwrap().contains(session_id) {
            return Err(PushError::Unreachable("connection closed".to_string()));
        }
        let event = serde_json::from_slice(&payload).expect("payload is a wire event");
        self.events
            .lock()
            .unwrap()
            .push((session_id.to_string(), event));
        Ok(())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

struct Fixture {
    relay: Relay,
    store: Arc<MemoryStore>,
    transport: Arc<TestTransport>,
    feed: UnboundedReceiver<ChangeRecord>,
}

fn fixture() -> Fixture {
    init_tracing();

    let (store, feed) = MemoryStore::with_change_feed();
    let store = Arc::new(store);
    let transport = Arc::new(TestTransport::default());
    let relay = Relay::new(
        Arc::clone(&store) as Arc<dyn KeyedStore>,
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::new(BasicSanitizer),
        RelayConfig::default(),
    );

    Fixture {
        relay,
        store,
        transport,
        feed,
    }
}

/// Deliver all pending change records to the reactor, as the platform's
/// stream delivery would
async fn pump(relay: &Relay, feed: &mut UnboundedReceiver<ChangeRecord>) {
    let batch: Vec<ChangeRecord> = std::iter::from_fn(|| feed.try_recv().ok()).collect();
    if !batch.is_empty() {
        relay.on_change_batch(&batch).await.unwrap();
    }
}

#[tokio::test]
async fn two_session_chat_scenario() {
    let Fixture {
        relay,
        transport,
        mut feed,
        ..
    } = fixture();

    // A starts and is auto-joined to General; the join announcement goes
    // to the current membership, which is just A itself.
    relay.on_session_start("A").await.unwrap();
    pump(&relay, &mut feed).await;
    assert_eq!(
        transport.events_for("A"),
        [Event::SubscriberSub {
            channel_id: "General".to_string(),
            subscriber_id: "A".to_string(),
        }]
    );
    transport.clear();

    // B starts; A hears about it (and so does B, being a member by then).
    relay.on_session_start("B").await.unwrap();
    pump(&relay, &mut feed).await;
    let announcement = Event::SubscriberSub {
        channel_id: "General".to_string(),
        subscriber_id: "B".to_string(),
    };
    assert_eq!(transport.events_for("A"), [announcement.clone()]);
    assert_eq!(transport.events_for("B"), [announcement]);
    transport.clear();

    // B posts; everyone in General receives the sanitized message
    // synchronously.
    relay
        .on_action(
            "B",
            r#"{"action":"sendMessage","channelId":"General","name":"B","content":"<b>hi</b>"}"#,
        )
        .await
        .unwrap();
    let expected = Event::ChannelMessage {
        channel_id: "General".to_string(),
        name: "B".to_string(),
        content: "<b>hi</b>".to_string(),
    };
    assert_eq!(transport.events_for("A"), [expected.clone()]);
    assert_eq!(transport.events_for("B"), [expected]);

    // The message's own change record must not trigger a second delivery.
    let before = transport.events().len();
    pump(&relay, &mut feed).await;
    assert_eq!(transport.events().len(), before);
    transport.clear();

    // A ends; B hears the leave, A does not, and A's subscriptions are gone.
    relay.on_session_end("A").await.unwrap();
    pump(&relay, &mut feed).await;
    assert_eq!(
        transport.events_for("B"),
        [Event::SubscriberUnsub {
            channel_id: "General".to_string(),
            subscriber_id: "A".to_string(),
        }]
    );
    assert!(transport.events_for("A").is_empty());
    assert!(relay
        .index()
        .channels_for_session("A")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn sanitization_strips_disallowed_tags_from_delivery() {
    let Fixture {
        relay, transport, ..
    } = fixture();

    relay.on_session_start("A").await.unwrap();
    relay
        .on_action(
            "A",
            r#"{"action":"sendMessage","channelId":"General","name":"Bob!!","content":"<em>ok</em><script>steal()</script>"}"#,
        )
        .await
        .unwrap();

    let events = transport.events_for("A");
    assert_eq!(
        events,
        [Event::ChannelMessage {
            channel_id: "General".to_string(),
            name: "Bob".to_string(),
            content: "<em>ok</em>".to_string(),
        }]
    );
}

#[tokio::test]
async fn unreachable_recipient_does_not_block_the_rest() {
    let Fixture {
        relay, transport, ..
    } = fixture();

    for session in ["A", "B", "C"] {
        relay.on_session_start(session).await.unwrap();
    }
    transport.mark_unreachable("B");

    let report = relay
        .post_message("General", "A", "A", "hello all")
        .await
        .unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.delivered(), 2);
    assert!(!transport.events_for("A").is_empty());
    assert!(!transport.events_for("C").is_empty());
}

#[tokio::test]
async fn direct_store_write_triggers_announcement() {
    let Fixture {
        relay,
        store,
        transport,
        mut feed,
    } = fixture();

    relay.on_session_start("A").await.unwrap();
    pump(&relay, &mut feed).await;
    transport.clear();

    // An out-of-band writer (a bot, another subsystem) subscribes a session
    // by writing the store directly; the feed path announces it all the
    // same.
    store
        .put(Record::new("CHANNEL|General", "SESSION|bot-7"))
        .await
        .unwrap();
    pump(&relay, &mut feed).await;

    assert_eq!(
        transport.events_for("A"),
        [Event::SubscriberSub {
            channel_id: "General".to_string(),
            subscriber_id: "bot-7".to_string(),
        }]
    );
}
