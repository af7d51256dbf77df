//! # Conversation Store
//!
//! Keyed session state for the whole process. Each session id maps to its own
//! `Arc<Mutex<Session>>`, so requests on one session serialize while requests on
//! different sessions never wait on each other.
//!
//! The store is bounded: sessions idle for longer than the configured timeout are
//! pruned, and once the number of sessions exceeds the capacity the least recently
//! used ones are evicted. A session that is currently held by a request is never evicted
//! or reset.

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::config::SessionsConfig;
use crate::domain::types::{Message, Role};

/// One conversation: the system prompt followed by the chronological history.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    messages: Vec<Message>,
}

impl Session {
    /// A fresh session holds exactly one message, the system prompt.
    pub fn new(id: impl Into<String>, system_prompt: &str) -> Self {
        Self {
            id: id.into(),
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// Keeps the system message plus the most recent `ceiling - 1` messages once the
    /// history grows past `ceiling`. Whole messages only; returns how many were dropped.
    pub fn trim(&mut self, ceiling: usize) -> usize {
        let ceiling = ceiling.max(1);
        let len = self.messages.len();
        if len <= ceiling {
            return 0;
        }
        let excess = len - ceiling;
        self.messages.drain(1..1 + excess);
        excess
    }

    /// History as it should be sent to the model. Trimming can cut an assistant
    /// tool-call message while keeping its results; such orphaned tool results are
    /// left out here because the API rejects them.
    pub fn request_messages(&self) -> Vec<Message> {
        let mut seen_calls: HashSet<&str> = HashSet::new();
        let mut out = Vec::with_capacity(self.messages.len());

        for message in &self.messages {
            match message.role {
                Role::Assistant => {
                    seen_calls.extend(message.tool_calls.iter().map(|c| c.id.as_str()));
                }
                Role::Tool => {
                    let linked = message
                        .tool_call_id
                        .as_deref()
                        .is_some_and(|id| seen_calls.contains(id));
                    if !linked {
                        continue;
                    }
                }
                Role::System | Role::User => {}
            }
            out.push(message.clone());
        }
        out
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

struct SessionSlot {
    session: SharedSession,
    last_used: Instant,
}

impl SessionSlot {
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }
}

pub struct ConversationStore {
    sessions: DashMap<String, SessionSlot>,
    system_prompt: String,
    max_messages: usize,
    capacity: usize,
    idle_timeout: Duration,
}

impl ConversationStore {
    pub fn new(system_prompt: impl Into<String>, config: &SessionsConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            system_prompt: system_prompt.into(),
            max_messages: config.max_messages,
            capacity: config.capacity.max(1),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns the session for `session_id`, seeding it with the system prompt on first use.
    pub fn get_or_create(&self, session_id: &str) -> SharedSession {
        let now = Instant::now();
        let mut created = false;

        // The map guard must be released before eviction walks the shards.
        let session = {
            let mut slot = self
                .sessions
                .entry(session_id.to_string())
                .or_insert_with(|| {
                    created = true;
                    SessionSlot {
                        session: Arc::new(Mutex::new(Session::new(session_id, &self.system_prompt))),
                        last_used: now,
                    }
                });
            slot.last_used = now;
            slot.session.clone()
        };

        if created {
            tracing::info!(session = %session_id, "Created session");
            self.evict(session_id, now);
        }
        session
    }

    /// Appends to a session the caller has locked through [`get_or_create`](Self::get_or_create).
    pub fn append(&self, session: &mut Session, message: Message) {
        session.append(message);
    }

    /// Applies the retention ceiling to a locked session; returns how many messages were dropped.
    pub fn trim(&self, session: &mut Session) -> usize {
        let dropped = session.trim(self.max_messages);
        if dropped > 0 {
            tracing::debug!(session = %session.id, dropped, "Trimmed history");
        }
        dropped
    }

    /// Copy of a session's history, if the session exists.
    pub async fn snapshot(&self, session_id: &str) -> Option<Vec<Message>> {
        let session = self.sessions.get(session_id).map(|slot| slot.session.clone())?;
        let guard = session.lock().await;
        Some(guard.messages().to_vec())
    }

    /// Forgets a session; the next use of the id starts over from the system prompt.
    /// A session that a request still holds or waits on is left alone, so its turn is
    /// not committed into a detached history. Returns whether the session was removed.
    pub fn reset(&self, session_id: &str) -> bool {
        self.sessions
            .remove_if(session_id, |_, slot| !slot.in_use())
            .is_some()
    }

    fn evict(&self, keep: &str, now: Instant) {
        let idle_timeout = self.idle_timeout;
        self.sessions.retain(|id, slot| {
            id == keep || slot.in_use() || now.duration_since(slot.last_used) < idle_timeout
        });

        while self.sessions.len() > self.capacity {
            let oldest = self
                .sessions
                .iter()
                .filter(|slot| slot.key() != keep && !slot.value().in_use())
                .min_by_key(|slot| slot.value().last_used)
                .map(|slot| slot.key().clone());

            match oldest {
                Some(id) => {
                    self.sessions.remove(&id);
                    tracing::info!(session = %id, "Evicted least recently used session");
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ToolCallRequest;

    fn store(capacity: usize) -> ConversationStore {
        ConversationStore::new(
            "system prompt",
            &SessionsConfig {
                max_messages: 28,
                capacity,
                idle_timeout_secs: 3600,
            },
        )
    }

    async fn append(store: &ConversationStore, session_id: &str, message: Message) {
        let session = store.get_or_create(session_id);
        let mut guard = session.lock().await;
        store.append(&mut guard, message);
    }

    #[tokio::test]
    async fn test_new_session_is_seeded_once() {
        let store = store(16);

        let session = store.get_or_create("a");
        {
            let guard = session.lock().await;
            assert_eq!(guard.len(), 1);
            assert_eq!(guard.messages()[0].role, Role::System);
            assert_eq!(guard.messages()[0].content.as_deref(), Some("system prompt"));
        }

        append(&store, "a", Message::user("hello")).await;
        let again = store.get_or_create("a");
        assert!(Arc::ptr_eq(&session, &again));
        assert_eq!(again.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_trim_keeps_system_and_recent() {
        let store = store(16);
        for i in 0..40 {
            append(&store, "a", Message::user(format!("m{i}"))).await;
        }

        let session = store.get_or_create("a");
        assert_eq!(store.trim(&mut *session.lock().await), 13);

        let history = store.snapshot("a").await.unwrap();
        assert_eq!(history.len(), 28);
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history[1].content.as_deref(), Some("m13"));
        assert_eq!(history[27].content.as_deref(), Some("m39"));
    }

    #[test]
    fn test_trim_below_ceiling_is_noop() {
        let mut session = Session::new("a", "sys");
        for i in 0..27 {
            session.append(Message::user(format!("m{i}")));
        }
        assert_eq!(session.trim(28), 0);
        assert_eq!(session.len(), 28);

        session.append(Message::user("m27"));
        assert_eq!(session.trim(28), 1);
        assert_eq!(session.len(), 28);
        assert_eq!(session.messages()[1].content.as_deref(), Some("m1"));
    }

    #[test]
    fn test_request_messages_skips_orphaned_tool_results() {
        let call = ToolCallRequest {
            id: "call_1".to_string(),
            function_name: "execute_kubectl".to_string(),
            arguments: "{}".to_string(),
        };
        let mut session = Session::new("a", "sys");
        session.append(Message::user("q"));
        session.append(Message::assistant_tool_calls(None, vec![call.clone()]));
        session.append(Message::tool_result(&call, "r"));
        session.append(Message::assistant("answer"));

        assert_eq!(session.request_messages().len(), 5);

        // Cut the assistant tool-call message but keep its result.
        session.trim(3);
        assert_eq!(session.len(), 3);
        let request = session.request_messages();
        assert_eq!(request.len(), 2);
        assert_eq!(request[0].role, Role::System);
        assert_eq!(request[1].content.as_deref(), Some("answer"));
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let store = store(2);
        append(&store, "a", Message::user("1")).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        append(&store, "b", Message::user("2")).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Touch "a" so "b" becomes the oldest.
        store.get_or_create("a");
        tokio::time::sleep(Duration::from_millis(5)).await;
        append(&store, "c", Message::user("3")).await;

        assert_eq!(store.len(), 2);
        assert!(store.snapshot("a").await.is_some());
        assert!(store.snapshot("b").await.is_none());
        assert!(store.snapshot("c").await.is_some());
    }

    #[tokio::test]
    async fn test_sessions_in_use_are_not_evicted() {
        let store = store(1);
        let held = store.get_or_create("a");
        let _guard = held.lock().await;

        store.get_or_create("b");

        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_pruned() {
        let store = ConversationStore::new(
            "sys",
            &SessionsConfig {
                max_messages: 28,
                capacity: 16,
                idle_timeout_secs: 0,
            },
        );
        append(&store, "a", Message::user("1")).await;
        append(&store, "b", Message::user("2")).await;

        assert_eq!(store.len(), 1);
        assert!(store.snapshot("b").await.is_some());
    }

    #[tokio::test]
    async fn test_reset_skips_held_session() {
        let store = store(16);
        append(&store, "a", Message::user("1")).await;

        let held = store.get_or_create("a");
        assert!(!store.reset("a"));
        assert_eq!(store.len(), 1);

        drop(held);
        assert!(store.reset("a"));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_reset_reseeds() {
        let store = store(16);
        append(&store, "a", Message::user("1")).await;

        assert!(store.reset("a"));
        assert!(!store.reset("a"));

        let session = store.get_or_create("a");
        assert_eq!(session.lock().await.len(), 1);
    }
}
