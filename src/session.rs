//! Session lookup: maps an opaque token to the acting user.
//!
//! Sessions are issued by an external login service. This crate only reads
//! them from the `sessions` table (`SqliteStore`). Tests use the in-process
//! `MemorySessions` map instead.

use chrono::NaiveDateTime;

use crate::models::Actor;
use crate::store::StoreError;

#[cfg(test)]
pub use memory::MemorySessions;

pub trait SessionProvider: Send + Sync {
    /// The actor behind `token`, or `None` if the token is unknown or expired.
    fn resolve(&self, token: &str, now: NaiveDateTime) -> Result<Option<Actor>, StoreError>;
}

#[cfg(test)]
mod memory {
    use std::collections::HashMap;
    use std::sync::RwLock;

    use chrono::NaiveDateTime;
    use uuid::Uuid;

    use super::SessionProvider;
    use crate::models::Actor;
    use crate::store::StoreError;

    #[derive(Default)]
    pub struct MemorySessions {
        sessions: RwLock<HashMap<String, (Actor, NaiveDateTime)>>,
    }

    impl MemorySessions {
        pub fn new() -> Self {
            Self::default()
        }

        /// Issue a fresh token for `actor`, valid until `expires_at`.
        pub fn issue(&self, actor: Actor, expires_at: NaiveDateTime) -> Result<String, StoreError> {
            let token = Uuid::new_v4().simple().to_string();
            self.sessions
                .write()
                .map_err(|_| StoreError::LockPoisoned)?
                .insert(token.clone(), (actor, expires_at));
            Ok(token)
        }
    }

    impl SessionProvider for MemorySessions {
        fn resolve(&self, token: &str, now: NaiveDateTime) -> Result<Option<Actor>, StoreError> {
            let sessions = self.sessions.read().map_err(|_| StoreError::LockPoisoned)?;
            Ok(sessions
                .get(token)
                .filter(|(_, expires_at)| *expires_at > now)
                .map(|(actor, _)| actor.clone()))
        }
    }
}
