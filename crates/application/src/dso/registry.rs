use super::DsoSession;
use crate::ports::ConnectionInfo;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Live DSO sessions of one server, keyed by connection id.
///
/// Sessions are created on the first stateful message of a connection and
/// dropped when the connection's cancellation token fires.
pub struct DsoSessions {
    sessions: DashMap<u64, Arc<DsoSession>>,
    idle_timeout: Duration,
}

impl DsoSessions {
    pub fn new(idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            idle_timeout,
        })
    }

    pub fn get_or_create(self: &Arc<Self>, connection: &ConnectionInfo) -> Arc<DsoSession> {
        if connection.cancel.is_cancelled() {
            return Arc::new(DsoSession::closed(self.idle_timeout));
        }

        let mut created = false;
        let session = self
            .sessions
            .entry(connection.id)
            .or_insert_with(|| {
                created = true;
                Arc::new(DsoSession::new(
                    self.idle_timeout,
                    Some(connection.cancel.clone()),
                ))
            })
            .clone();

        if created {
            let registry: Weak<Self> = Arc::downgrade(self);
            let token = connection.cancel.clone();
            let id = connection.id;
            tokio::spawn(async move {
                token.cancelled().await;
                if let Some(registry) = registry.upgrade() {
                    registry.sessions.remove(&id);
                }
            });
        }

        session
    }

    pub fn get(&self, connection_id: u64) -> Option<Arc<DsoSession>> {
        self.sessions.get(&connection_id).map(|s| s.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
