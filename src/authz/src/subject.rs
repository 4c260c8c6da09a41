//! Effective subject resolution
//!
//! A request names an authenticated user, but impersonation-aware checks
//! evaluate the administrator behind an impersonation session instead. The
//! resolver performs that substitution and keeps a handle on the live
//! session so a granted check can annotate it.

use crate::error::Result;
use crate::types::RequestContext;
use admingate_core::{IdentityStore, Realm, SessionLookup, User, UserSession, IMPERSONATOR_ROLES_NOTE};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whose roles a check is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImpersonationMode {
    /// The authenticated user, ignoring any impersonation
    #[default]
    NominalUser,
    /// The impersonating administrator when impersonation is active
    Impersonator,
}

impl From<bool> for ImpersonationMode {
    fn from(apply_to_impersonator: bool) -> Self {
        if apply_to_impersonator {
            ImpersonationMode::Impersonator
        } else {
            ImpersonationMode::NominalUser
        }
    }
}

/// Why a request carries no subject to evaluate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotApplicable {
    MissingUser,
    MissingRealm,
    /// No calling client; only the request filter needs one
    MissingClient,
    /// Session names an impersonator the identity store does not know
    ImpersonatorNotFound(String),
}

impl fmt::Display for NotApplicable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotApplicable::MissingUser => f.write_str("no authenticated user"),
            NotApplicable::MissingRealm => f.write_str("no realm"),
            NotApplicable::MissingClient => f.write_str("no calling client"),
            NotApplicable::ImpersonatorNotFound(id) => write!(f, "impersonator '{}' not found", id),
        }
    }
}

/// Active impersonation behind a request
#[derive(Clone)]
pub struct ImpersonationContext {
    /// Id read from the session's impersonator note
    pub impersonator_id: String,

    /// User being impersonated (the request's nominal user)
    pub impersonated: User,

    /// Session of the current request
    pub session: Arc<dyn UserSession>,
}

impl ImpersonationContext {
    /// Record which roles justified a grant on the current session
    ///
    /// Names are sorted and comma-joined. An empty set writes nothing.
    pub fn record_granting_roles<I, S>(&self, roles: I) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = roles.into_iter().map(|r| r.as_ref().to_string()).collect();
        if names.is_empty() {
            return None;
        }
        names.sort();
        names.dedup();

        let note = names.join(",");
        debug!("session {}: {} = {}", self.session.id(), IMPERSONATOR_ROLES_NOTE, note);
        self.session.set_note(IMPERSONATOR_ROLES_NOTE, &note);
        Some(note)
    }
}

impl fmt::Debug for ImpersonationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImpersonationContext")
            .field("impersonator_id", &self.impersonator_id)
            .field("impersonated", &self.impersonated.id)
            .field("session", &self.session.id())
            .finish()
    }
}

/// Identity whose roles a decision is evaluated against
#[derive(Debug, Clone)]
pub struct Subject {
    /// Effective user: the impersonator when impersonation was substituted
    pub user: User,

    /// Present only when the impersonator was substituted
    pub impersonation: Option<ImpersonationContext>,
}

impl Subject {
    pub fn nominal(user: User) -> Self {
        Self {
            user,
            impersonation: None,
        }
    }

    pub fn is_impersonating(&self) -> bool {
        self.impersonation.is_some()
    }
}

/// Outcome of subject resolution
#[derive(Debug, Clone)]
pub enum Resolution {
    Subject(Subject),
    NotApplicable(NotApplicable),
}

impl Resolution {
    pub fn subject(self) -> Option<Subject> {
        match self {
            Resolution::Subject(subject) => Some(subject),
            Resolution::NotApplicable(_) => None,
        }
    }
}

/// Stateless subject resolver; per-request state comes in as arguments
#[derive(Clone)]
pub struct SubjectResolver {
    store: Arc<dyn IdentityStore>,
    sessions: Arc<dyn SessionLookup>,
}

impl SubjectResolver {
    pub fn new(store: Arc<dyn IdentityStore>, sessions: Arc<dyn SessionLookup>) -> Self {
        Self { store, sessions }
    }

    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    /// Resolve the subject a check should evaluate
    pub async fn resolve(&self, ctx: &RequestContext, mode: ImpersonationMode) -> Result<Resolution> {
        let Some(realm) = ctx.realm.as_ref() else {
            warn!("Subject resolution not applicable: no realm");
            return Ok(Resolution::NotApplicable(NotApplicable::MissingRealm));
        };
        let Some(user) = ctx.user.as_ref() else {
            warn!("Subject resolution not applicable: no authenticated user");
            return Ok(Resolution::NotApplicable(NotApplicable::MissingUser));
        };

        if mode == ImpersonationMode::NominalUser {
            return Ok(Resolution::Subject(Subject::nominal(user.clone())));
        }

        let Some((session, impersonator_id)) = self
            .impersonation_session(realm, ctx.identity_cookie.as_deref())
            .await?
        else {
            debug!("No active impersonation for user {}", user.username);
            return Ok(Resolution::Subject(Subject::nominal(user.clone())));
        };

        match self.store.get_user_by_id(realm, &impersonator_id).await? {
            Some(impersonator) => {
                debug!(
                    "User {} is impersonated by {}; evaluating the impersonator",
                    user.username, impersonator.username
                );
                Ok(Resolution::Subject(Subject {
                    user: impersonator,
                    impersonation: Some(ImpersonationContext {
                        impersonator_id,
                        impersonated: user.clone(),
                        session,
                    }),
                }))
            }
            None => {
                warn!("Impersonator {} not found in realm {}", impersonator_id, realm.name);
                Ok(Resolution::NotApplicable(NotApplicable::ImpersonatorNotFound(
                    impersonator_id,
                )))
            }
        }
    }

    /// Session behind the identity cookie, if it carries an impersonator
    pub async fn impersonation_session(
        &self,
        realm: &Realm,
        identity_cookie: Option<&str>,
    ) -> Result<Option<(Arc<dyn UserSession>, String)>> {
        let session = self
            .sessions
            .authenticate_identity_cookie(realm, identity_cookie)
            .await?;

        Ok(session.and_then(|session| {
            session
                .impersonator_id()
                .filter(|id| !id.trim().is_empty())
                .map(|id| (session, id))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use admingate_core::{
        InMemoryIdentityStore, InMemorySession, InMemorySessionLookup, IMPERSONATOR_ID_NOTE,
    };

    fn fixture() -> (SubjectResolver, Arc<InMemorySession>) {
        let store = Arc::new(InMemoryIdentityStore::new());
        store.add_user("acme", User::new("admin-1", "root"));
        store.add_user("acme", User::new("u-1", "alice"));

        let session = Arc::new(InMemorySession::new("s-1").with_note(IMPERSONATOR_ID_NOTE, "admin-1"));
        let sessions = Arc::new(InMemorySessionLookup::new());
        sessions.insert("cookie-imp", Arc::clone(&session));
        sessions.insert("cookie-plain", Arc::new(InMemorySession::new("s-2")));
        sessions.insert(
            "cookie-ghost",
            Arc::new(InMemorySession::new("s-3").with_note(IMPERSONATOR_ID_NOTE, "ghost")),
        );

        (SubjectResolver::new(store, sessions), session)
    }

    fn ctx(cookie: Option<&str>) -> RequestContext {
        let ctx = RequestContext::new()
            .with_realm(Realm::new("acme"))
            .with_user(User::new("u-1", "alice"));
        match cookie {
            Some(cookie) => ctx.with_identity_cookie(cookie),
            None => ctx,
        }
    }

    #[tokio::test]
    async fn test_missing_user_or_realm() {
        let (resolver, _) = fixture();

        let no_user = RequestContext::new().with_realm(Realm::new("acme"));
        let resolution = resolver.resolve(&no_user, ImpersonationMode::NominalUser).await.unwrap();
        assert!(matches!(resolution, Resolution::NotApplicable(NotApplicable::MissingUser)));

        let no_realm = RequestContext::new().with_user(User::new("u-1", "alice"));
        let resolution = resolver.resolve(&no_realm, ImpersonationMode::Impersonator).await.unwrap();
        assert!(matches!(resolution, Resolution::NotApplicable(NotApplicable::MissingRealm)));
    }

    #[tokio::test]
    async fn test_nominal_mode_ignores_impersonation() {
        let (resolver, _) = fixture();
        let subject = resolver
            .resolve(&ctx(Some("cookie-imp")), ImpersonationMode::NominalUser)
            .await
            .unwrap()
            .subject()
            .unwrap();

        assert_eq!(subject.user.id, "u-1");
        assert!(!subject.is_impersonating());
    }

    #[tokio::test]
    async fn test_impersonator_substituted() {
        let (resolver, _) = fixture();
        let subject = resolver
            .resolve(&ctx(Some("cookie-imp")), ImpersonationMode::Impersonator)
            .await
            .unwrap()
            .subject()
            .unwrap();

        assert_eq!(subject.user.id, "admin-1");
        let impersonation = subject.impersonation.unwrap();
        assert_eq!(impersonation.impersonator_id, "admin-1");
        assert_eq!(impersonation.impersonated.id, "u-1");
    }

    #[tokio::test]
    async fn test_no_session_or_marker_keeps_nominal_user() {
        let (resolver, _) = fixture();

        for cookie in [None, Some("cookie-plain"), Some("unknown")] {
            let subject = resolver
                .resolve(&ctx(cookie), ImpersonationMode::Impersonator)
                .await
                .unwrap()
                .subject()
                .unwrap();
            assert_eq!(subject.user.id, "u-1");
            assert!(!subject.is_impersonating());
        }
    }

    #[tokio::test]
    async fn test_unknown_impersonator() {
        let (resolver, _) = fixture();
        let resolution = resolver
            .resolve(&ctx(Some("cookie-ghost")), ImpersonationMode::Impersonator)
            .await
            .unwrap();

        match resolution {
            Resolution::NotApplicable(NotApplicable::ImpersonatorNotFound(id)) => assert_eq!(id, "ghost"),
            other => panic!("Expected ImpersonatorNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_record_granting_roles() {
        let (resolver, session) = fixture();
        let subject = resolver
            .resolve(&ctx(Some("cookie-imp")), ImpersonationMode::Impersonator)
            .await
            .unwrap()
            .subject()
            .unwrap();
        let impersonation = subject.impersonation.unwrap();

        assert_eq!(impersonation.record_granting_roles(Vec::<String>::new()), None);
        assert_eq!(session.note(IMPERSONATOR_ROLES_NOTE), None);

        let note = impersonation.record_granting_roles(["ops-lead", "auditor", "ops-lead"]);
        assert_eq!(note.as_deref(), Some("auditor,ops-lead"));
        assert_eq!(session.note(IMPERSONATOR_ROLES_NOTE).as_deref(), Some("auditor,ops-lead"));
    }
}
