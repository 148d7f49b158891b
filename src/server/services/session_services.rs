use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

/// plenty for one household, keeps a client cycling user agents from growing the map forever
pub const MAX_SESSIONS: usize = 256;

struct SessionEntry {
    stream_base: String,
    generation: u64,
    last_selected: u64,
}

#[derive(Default)]
struct Sessions {
    streams: HashMap<String, SessionEntry>,
    // oldest provider settings generation still accepted
    generation: u64,
    clock: u64,
}

/// remembers which upstream stream each player is watching
///
/// chunk and segment requests come back as relative paths without any channel in them, so the
/// base url picked on channel selection is the only way to know where they go
pub struct SessionStore {
    state: Mutex<Sessions>,
    capacity: usize,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(Sessions::default()),
            capacity: capacity.max(1),
        }
    }

    /// replaces whatever the session was watching before
    ///
    /// a selection made under settings older than the last reset is dropped, returns whether the
    /// stream was stored
    pub fn select_stream(&self, client_id: &str, stream_base: String, generation: u64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if generation < state.generation {
            debug!(
                "dropping selection for {} made under generation {} (now {})",
                client_id, generation, state.generation
            );
            return false;
        }

        if !state.streams.contains_key(client_id) && state.streams.len() >= self.capacity {
            let oldest = state
                .streams
                .iter()
                .min_by_key(|(_, entry)| entry.last_selected)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                debug!("session limit reached, forgetting {}", oldest);
                state.streams.remove(&oldest);
            }
        }

        state.clock += 1;
        let last_selected = state.clock;
        debug!("session {} now on {}", client_id, stream_base);
        state.streams.insert(
            client_id.to_string(),
            SessionEntry {
                stream_base,
                generation,
                last_selected,
            },
        );
        true
    }

    pub fn stream_base(&self, client_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .streams
            .get(client_id)
            .map(|entry| entry.stream_base.clone())
    }

    /// forgets every stream selected before `generation` and refuses late selections from it
    pub fn reset(&self, generation: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.generation = state.generation.max(generation);
        let floor = state.generation;
        state.streams.retain(|_, entry| entry.generation >= floor);
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .streams
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_do_not_see_each_other() {
        let store = SessionStore::new();
        store.select_stream("tv", "https://a.example/ch01q1.stream".to_string(), 0);
        store.select_stream("phone", "https://a.example/ch02q1.stream".to_string(), 0);

        assert_eq!(
            store.stream_base("tv").as_deref(),
            Some("https://a.example/ch01q1.stream")
        );
        assert_eq!(
            store.stream_base("phone").as_deref(),
            Some("https://a.example/ch02q1.stream")
        );
        assert_eq!(store.stream_base("laptop"), None);
    }

    #[test]
    fn new_selection_overwrites() {
        let store = SessionStore::new();
        store.select_stream("tv", "https://a.example/ch01q1.stream".to_string(), 0);
        store.select_stream("tv", "https://a.example/ch09q1.stream".to_string(), 0);

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.stream_base("tv").as_deref(),
            Some("https://a.example/ch09q1.stream")
        );
    }

    #[test]
    fn reset_forgets_older_generations_only() {
        let store = SessionStore::new();
        store.select_stream("tv", "https://old.example/ch01q1.stream".to_string(), 0);
        // already picked up the new account before the reset landed
        store.select_stream("phone", "https://new.example/ch02q1.stream".to_string(), 1);

        store.reset(1);

        assert_eq!(store.stream_base("tv"), None);
        assert_eq!(
            store.stream_base("phone").as_deref(),
            Some("https://new.example/ch02q1.stream")
        );
    }

    #[test]
    fn late_selections_from_old_settings_are_refused() {
        let store = SessionStore::new();
        store.reset(2);

        assert!(!store.select_stream("tv", "https://old.example/ch01q1.stream".to_string(), 1));
        assert!(store.is_empty());
        assert!(store.select_stream("tv", "https://new.example/ch01q1.stream".to_string(), 2));
    }

    #[test]
    fn evicts_the_least_recently_selected_session() {
        let store = SessionStore::with_capacity(2);
        store.select_stream("a", "https://s.example/ch01q1.stream".to_string(), 0);
        store.select_stream("b", "https://s.example/ch02q1.stream".to_string(), 0);
        // a is now the most recent
        store.select_stream("a", "https://s.example/ch03q1.stream".to_string(), 0);
        store.select_stream("c", "https://s.example/ch04q1.stream".to_string(), 0);

        assert_eq!(store.len(), 2);
        assert_eq!(store.stream_base("b"), None);
        assert!(store.stream_base("a").is_some());
        assert!(store.stream_base("c").is_some());
    }
}
