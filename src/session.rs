// src/session.rs
// In-memory session registry. Each thread owns one state behind its own
// mutex, so turns on the same thread serialize while distinct threads run
// concurrently. The outer map lock is only held for lookup and insert.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::graph::state::ConversationState;

#[derive(Default)]
pub struct Sessions {
    inner: RwLock<HashMap<String, Arc<Mutex<ConversationState>>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a thread, creating it on first use. Identity fields are set
    /// at creation and never rewritten by later requests.
    pub async fn entry(
        &self,
        thread_id: &str,
        user_id: &str,
        phone_number: Option<&str>,
    ) -> Arc<Mutex<ConversationState>> {
        {
            let map = self.inner.read().await;
            if let Some(handle) = map.get(thread_id) {
                return Arc::clone(handle);
            }
        }

        let mut map = self.inner.write().await;
        // Another task may have created it between the two locks.
        if let Some(handle) = map.get(thread_id) {
            return Arc::clone(handle);
        }

        let mut state = ConversationState::new(thread_id, user_id);
        state.phone_number = phone_number.map(str::to_string);
        let handle = Arc::new(Mutex::new(state));
        map.insert(thread_id.to_string(), Arc::clone(&handle));
        handle
    }

    /// Clone of a thread's committed state, if the thread exists.
    pub async fn snapshot(&self, thread_id: &str) -> Option<ConversationState> {
        let handle = {
            let map = self.inner.read().await;
            map.get(thread_id).map(Arc::clone)
        }?;
        let guard = handle.lock().await;
        Some(guard.clone())
    }
}
