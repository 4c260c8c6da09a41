//! Session access used to discover impersonation

use crate::error::Result;
use crate::types::Realm;
use crate::IMPERSONATOR_ID_NOTE;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Live user session owned by the host's session store
pub trait UserSession: Send + Sync {
    /// Session identifier
    fn id(&self) -> &str;

    /// Read a single note
    fn note(&self, key: &str) -> Option<String>;

    /// Snapshot of all notes
    fn notes(&self) -> HashMap<String, String>;

    /// Write a note onto this session
    fn set_note(&self, key: &str, value: &str);

    /// Id of the administrator impersonating the session's user, if any
    fn impersonator_id(&self) -> Option<String> {
        self.note(IMPERSONATOR_ID_NOTE)
    }
}

/// Re-authentication of the identity cookie carried by a request
#[async_trait]
pub trait SessionLookup: Send + Sync {
    /// Resolve the session behind an identity cookie
    ///
    /// Returns `Ok(None)` when there is no cookie or it does not map to a
    /// live session.
    async fn authenticate_identity_cookie(
        &self,
        realm: &Realm,
        identity_cookie: Option<&str>,
    ) -> Result<Option<Arc<dyn UserSession>>>;
}
