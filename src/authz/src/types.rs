//! Per-request inputs and verdicts

use crate::catalog::OperationDescriptor;
use admingate_core::{Client, Realm, User};
use serde::{Deserialize, Serialize};

/// Everything the host knows about the request being evaluated
///
/// Absent fields are legal: the filter and gates decide what a missing user,
/// realm or client means for them.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Tenant the request is addressed to
    pub realm: Option<Realm>,

    /// Authenticated principal
    pub user: Option<User>,

    /// Client making the call (console application, or the client that
    /// triggered an authentication flow)
    pub client: Option<Client>,

    /// Operation the request resolves to, as reported by the host framework
    pub operation: Option<OperationDescriptor>,

    /// Identity cookie value used to re-authenticate the session
    pub identity_cookie: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_realm(mut self, realm: Realm) -> Self {
        self.realm = Some(realm);
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_operation(mut self, operation: OperationDescriptor) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_identity_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.identity_cookie = Some(cookie.into());
        self
    }
}

/// Permit/deny outcome of an authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Permit,
    Deny,
}

impl Verdict {
    pub fn is_permit(self) -> bool {
        matches!(self, Verdict::Permit)
    }

    pub fn is_deny(self) -> bool {
        !self.is_permit()
    }
}

impl From<bool> for Verdict {
    fn from(permitted: bool) -> Self {
        if permitted {
            Verdict::Permit
        } else {
            Verdict::Deny
        }
    }
}
