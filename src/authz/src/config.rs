//! Engine and gate configuration

use crate::error::{GuardError, Result};
use admingate_core::Realm;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Theme name that opts a console into restricted administration
pub const RESTRICTED_THEME: &str = "restricted";

/// Token in a required role name standing for the current client id
pub const CLIENT_ID_PLACEHOLDER: &str = "${clientId}";

/// Gate configuration key: required role name
pub const REQUIRED_ROLE_NAME: &str = "roleName";

/// Gate configuration key: evaluate the impersonator instead of the user
pub const APPLY_TO_IMPERSONATOR: &str = "applyToImpersonator";

/// Gate configuration key: flip the final result
pub const NEGATE_RESULT: &str = "negateResult";

/// Gate configuration key: fail impersonator checks when nobody impersonates
pub const ENFORCE_STRICTLY: &str = "enforceStrictly";

/// What the request filter does when the request context lacks a user,
/// realm or calling client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotApplicableAction {
    /// Let the request through unfiltered
    Skip,
    /// Reject the request
    Deny,
}

impl std::str::FromStr for NotApplicableAction {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(NotApplicableAction::Skip),
            "deny" => Ok(NotApplicableAction::Deny),
            other => Err(GuardError::InvalidConfig(format!(
                "not-applicable action must be 'skip' or 'deny', got '{}'",
                other
            ))),
        }
    }
}

/// Which realm theme gates a console binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    Account,
    Admin,
}

impl ThemeKind {
    fn theme_of(self, realm: &Realm) -> Option<&str> {
        match self {
            ThemeKind::Account => realm.account_theme.as_deref(),
            ThemeKind::Admin => realm.admin_theme.as_deref(),
        }
    }
}

/// Maps a console client to the client whose roles control it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleBinding {
    /// Client id of the console application making the call
    pub console_client_id: String,

    /// Client id declaring the controlling roles
    pub role_client_id: String,

    /// Realm theme that must equal the restricted theme for the binding to apply
    pub theme: ThemeKind,
}

impl ConsoleBinding {
    pub fn new(console_client_id: &str, role_client_id: &str, theme: ThemeKind) -> Self {
        Self {
            console_client_id: console_client_id.to_string(),
            role_client_id: role_client_id.to_string(),
            theme,
        }
    }
}

/// Request filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Theme name that enables filtering for a console
    pub restricted_theme: String,

    /// Behaviour when user, realm or calling client is missing
    pub not_applicable: NotApplicableAction,

    /// Evaluate the impersonator rather than the impersonated user
    pub apply_to_impersonator: bool,

    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Console -> role client bindings
    pub console_bindings: Vec<ConsoleBinding>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            restricted_theme: RESTRICTED_THEME.to_string(),
            not_applicable: NotApplicableAction::Skip,
            apply_to_impersonator: false,
            enable_metrics: true,
            console_bindings: vec![
                ConsoleBinding::new("account-console", "account", ThemeKind::Account),
                ConsoleBinding::new("security-admin-console", "realm-management", ThemeKind::Admin),
            ],
        }
    }
}

impl EngineConfig {
    /// Build a configuration from `ADMINGATE_*` environment variables,
    /// falling back to defaults for anything unset
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(theme) = std::env::var("ADMINGATE_RESTRICTED_THEME") {
            config.restricted_theme = theme;
        }
        if let Ok(action) = std::env::var("ADMINGATE_NOT_APPLICABLE") {
            config.not_applicable = action.parse()?;
        }
        if let Ok(flag) = std::env::var("ADMINGATE_APPLY_TO_IMPERSONATOR") {
            config.apply_to_impersonator = parse_bool(Some(&flag));
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.restricted_theme.trim().is_empty() {
            return Err(GuardError::InvalidConfig("restricted theme cannot be empty".to_string()));
        }

        for binding in &self.console_bindings {
            if binding.console_client_id.is_empty() || binding.role_client_id.is_empty() {
                return Err(GuardError::InvalidConfig(format!(
                    "console binding '{}' -> '{}' has an empty client id",
                    binding.console_client_id, binding.role_client_id
                )));
            }
        }

        Ok(())
    }

    /// Role client controlling requests from `console_client_id`, provided the
    /// realm's matching theme is the restricted one
    pub fn role_client_for(&self, realm: &Realm, console_client_id: &str) -> Option<&str> {
        self.console_bindings
            .iter()
            .find(|binding| binding.console_client_id == console_client_id)
            .filter(|binding| binding.theme.theme_of(realm) == Some(self.restricted_theme.as_str()))
            .map(|binding| binding.role_client_id.as_str())
    }
}

/// Require-role gate configuration, as set on a flow step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Required role, `name` for realm roles or `clientId.name` for client roles
    pub role_name: Option<String>,

    /// Evaluate the impersonator instead of the user
    pub apply_to_impersonator: bool,

    /// Flip the final result
    pub negate: bool,

    /// Fail impersonator checks when impersonation is not active
    pub enforce_strictly: bool,
}

impl GateConfig {
    pub fn new(role_name: impl Into<String>) -> Self {
        Self {
            role_name: Some(role_name.into()),
            ..Default::default()
        }
    }

    pub fn apply_to_impersonator(mut self, enabled: bool) -> Self {
        self.apply_to_impersonator = enabled;
        self
    }

    pub fn negate(mut self, enabled: bool) -> Self {
        self.negate = enabled;
        self
    }

    pub fn enforce_strictly(mut self, enabled: bool) -> Self {
        self.enforce_strictly = enabled;
        self
    }

    /// Read the gate configuration from a flow step's string map
    pub fn from_map(config: &HashMap<String, String>) -> Self {
        Self {
            role_name: config.get(REQUIRED_ROLE_NAME).cloned(),
            apply_to_impersonator: parse_bool(config.get(APPLY_TO_IMPERSONATOR).map(String::as_str)),
            negate: parse_bool(config.get(NEGATE_RESULT).map(String::as_str)),
            enforce_strictly: parse_bool(config.get(ENFORCE_STRICTLY).map(String::as_str)),
        }
    }
}

/// Case-insensitive "true"; anything else (including absence) is false
pub(crate) fn parse_bool(value: Option<&str>) -> bool {
    value.map(|v| v.trim().eq_ignore_ascii_case("true")).unwrap_or(false)
}
