//! Session registry keyed by conversation.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::session::Session;
use crate::transport::ChatId;

/// Result of trying to open a session.
#[derive(Debug)]
pub enum OpenSession {
    /// A fresh session was registered.
    Opened(Arc<Session>),
    /// A session that had not started downloading was replaced.
    Replaced {
        session: Arc<Session>,
        previous: Arc<Session>,
    },
    /// A download is in flight for this conversation.
    Busy(Arc<Session>),
}

/// Live sessions, at most one per conversation.
///
/// Entries are evicted when their attempt ends, so the map only holds
/// conversations that are currently mid-dialogue.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<ChatId, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `chat`.
    ///
    /// A session whose download is in flight is kept and `Busy` is returned.
    /// A session still collecting input holds nothing, so it is superseded.
    pub fn open(&self, chat: ChatId) -> OpenSession {
        match self.sessions.entry(chat) {
            Entry::Occupied(mut entry) => {
                if entry.get().state().is_downloading() {
                    return OpenSession::Busy(Arc::clone(entry.get()));
                }
                let session = Arc::new(Session::new(chat));
                let previous = entry.insert(Arc::clone(&session));
                previous.finish();
                debug!(chat = %chat, previous = previous.id(), session = session.id(), "Session superseded");
                OpenSession::Replaced { session, previous }
            }
            Entry::Vacant(entry) => {
                let session = Arc::new(Session::new(chat));
                entry.insert(Arc::clone(&session));
                debug!(chat = %chat, session = session.id(), "Session opened");
                OpenSession::Opened(session)
            }
        }
    }

    pub fn get(&self, chat: ChatId) -> Option<Arc<Session>> {
        self.sessions.get(&chat).map(|entry| Arc::clone(entry.value()))
    }

    /// Evict `session`, unless it has already been replaced.
    ///
    /// Returns true when the entry was removed.
    pub fn remove(&self, session: &Arc<Session>) -> bool {
        session.finish();
        let removed = self
            .sessions
            .remove_if(&session.chat(), |_, current| Arc::ptr_eq(current, session))
            .is_some();
        if removed {
            debug!(chat = %session.chat(), session = session.id(), "Session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
