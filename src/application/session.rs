use crate::domain::error::DomainError;
use crate::domain::storage::{KeyValueStore, SESSION_KEY};
use crate::domain::user::User;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

/// The single "who is logged in" record shared by the auth and bill stores.
pub struct SessionStore<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> Clone for SessionStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The logged-in user. An unreadable or malformed record counts as no
    /// session.
    pub fn current(&self) -> Option<User> {
        let raw = match self.store.get_item(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                trace!("No active session");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read session, treating as logged out");
                return None;
            }
        };

        match serde_json::from_str::<User>(&raw) {
            Ok(user) => {
                trace!(user_id = %user.id, "Active session found");
                Some(user)
            }
            Err(e) => {
                warn!(error = %e, "Malformed session record, treating as logged out");
                None
            }
        }
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub fn establish(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user)
            .map_err(|e| DomainError::StorageWrite(format!("{}: {}", SESSION_KEY, e)))?;
        self.store
            .set_item(SESSION_KEY, &raw)
            .map_err(|e| DomainError::StorageWrite(format!("{}: {}", SESSION_KEY, e)))?;
        debug!("Session established");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<()> {
        self.store
            .remove_item(SESSION_KEY)
            .map_err(|e| DomainError::StorageWrite(format!("{}: {}", SESSION_KEY, e)))?;
        debug!("Session cleared");
        Ok(())
    }
}
