//! Session state consulted by the scheduler and the CRUD surface.

use canopy_engine::Record;
use std::sync::{PoisonError, RwLock};

/// Who is signed in and whether the remote is reachable.
pub trait Session: Send + Sync {
    /// Whether a user is signed in.
    fn logged_in(&self) -> bool;

    /// The builder (tenant) record every resource tree is rooted at.
    fn builder(&self) -> Option<Record>;

    /// Whether the device is online.
    fn online(&self) -> bool;

    /// Tenant scope used to prefix store keys.
    fn builder_id(&self) -> Option<String> {
        self.builder().and_then(|b| b.id()).map(|id| id.to_string())
    }
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    builder: Option<Record>,
    online: bool,
}

/// Session whose state is flipped at runtime by the embedding application.
#[derive(Debug, Default)]
pub struct SharedSession {
    state: RwLock<SessionState>,
}

impl SharedSession {
    /// Create a signed-out, offline session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an online session for the given builder.
    pub fn signed_in(builder: Record) -> Self {
        Self {
            state: RwLock::new(SessionState {
                builder: Some(builder),
                online: true,
            }),
        }
    }

    /// Sign in as `builder`.
    pub fn sign_in(&self, builder: Record) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .builder = Some(builder);
    }

    /// Sign out.
    pub fn sign_out(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .builder = None;
    }

    /// Record connectivity changes.
    pub fn set_online(&self, online: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .online = online;
    }
}

impl Session for SharedSession {
    fn logged_in(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .builder
            .is_some()
    }

    fn builder(&self) -> Option<Record> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .builder
            .clone()
    }

    fn online(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .online
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn starts_signed_out_and_offline() {
        let session = SharedSession::new();
        assert!(!session.logged_in());
        assert!(!session.online());
        assert_eq!(session.builder_id(), None);
    }

    #[test]
    fn sign_in_and_out() {
        let session = SharedSession::new();
        session.sign_in(Record::from_value(json!({"id": 7, "name": "Acme"})).unwrap());
        session.set_online(true);

        assert!(session.logged_in());
        assert!(session.online());
        assert_eq!(session.builder_id().as_deref(), Some("7"));

        session.sign_out();
        assert!(!session.logged_in());
    }
}
