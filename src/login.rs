use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collab::{CallResult, Capability};

pub const DEFAULT_CREDENTIAL_ENV: &str = "REFLEX_SESSION_TOKEN";
pub const DEFAULT_LOGIN_TYPE_ENV: &str = "REFLEX_LOGIN_TYPE";

/// Hints passed to the host when asking it to log the user in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOptions {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub login_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guide_word: Option<String>,
}

/// Host login capability
pub trait LoginProvider: Send + Sync {
    fn is_login(&self) -> CallResult<bool>;
    /// Ask the host to log in; `Ok(true)` once the user is logged in
    fn login(&self, options: &LoginOptions) -> CallResult<bool>;
    fn login_type(&self) -> Option<String>;
}

/// Everything the game needs to know about login: a flag and a label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginState {
    pub logged_in: bool,
    pub login_type: Option<String>,
}

impl LoginState {
    /// Collapse the capability into a state; any failure reads as logged out
    pub fn resolve(provider: &Capability<Arc<dyn LoginProvider>>) -> Self {
        match provider {
            Capability::Unavailable => Self::default(),
            Capability::Available(p) => {
                let logged_in = p.is_login().logged("login").ok().unwrap_or(false);
                Self {
                    logged_in,
                    login_type: if logged_in { p.login_type() } else { None },
                }
            }
        }
    }

    /// Ask the host to log in, then re-resolve
    pub fn login(provider: &Capability<Arc<dyn LoginProvider>>, options: &LoginOptions) -> Self {
        match provider {
            Capability::Unavailable => Self::default(),
            Capability::Available(p) => {
                let logged_in = p.login(options).logged("login").ok().unwrap_or(false);
                info!(logged_in, "login attempt finished");
                if logged_in {
                    Self {
                        logged_in: true,
                        login_type: p.login_type(),
                    }
                } else {
                    Self::default()
                }
            }
        }
    }

    /// Upper-cased label for display, e.g. "QQ"
    pub fn label(&self) -> Option<String> {
        self.login_type.as_ref().map(|t| t.to_uppercase())
    }
}

/// Reads the session credential and login type from environment variables.
///
/// A terminal has no host SDK; the embedding shell exports the token instead.
#[derive(Debug, Clone)]
pub struct EnvLogin {
    credential_var: String,
    login_type_var: String,
}

impl EnvLogin {
    pub fn new(credential_var: impl Into<String>, login_type_var: impl Into<String>) -> Self {
        Self {
            credential_var: credential_var.into(),
            login_type_var: login_type_var.into(),
        }
    }

    pub fn credential(&self) -> Option<String> {
        std::env::var(&self.credential_var)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

impl Default for EnvLogin {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIAL_ENV, DEFAULT_LOGIN_TYPE_ENV)
    }
}

impl LoginProvider for EnvLogin {
    fn is_login(&self) -> CallResult<bool> {
        CallResult::Ok(self.credential().is_some())
    }

    fn login(&self, _options: &LoginOptions) -> CallResult<bool> {
        match self.credential() {
            Some(_) => CallResult::Ok(true),
            None => CallResult::Failed(format!("{} is not set", self.credential_var)),
        }
    }

    fn login_type(&self) -> Option<String> {
        std::env::var(&self.login_type_var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| Some("token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        logged_in: CallResult<bool>,
    }

    impl LoginProvider for Fixed {
        fn is_login(&self) -> CallResult<bool> {
            self.logged_in.clone()
        }

        fn login(&self, _options: &LoginOptions) -> CallResult<bool> {
            CallResult::TimedOut
        }

        fn login_type(&self) -> Option<String> {
            Some("qq".into())
        }
    }

    fn cap(p: Fixed) -> Capability<Arc<dyn LoginProvider>> {
        Capability::Available(Arc::new(p))
    }

    #[test]
    fn test_unavailable_is_logged_out() {
        let state = LoginState::resolve(&Capability::Unavailable);
        assert!(!state.logged_in);
        assert_eq!(state.login_type, None);
    }

    #[test]
    fn test_resolve_logged_in() {
        let state = LoginState::resolve(&cap(Fixed {
            logged_in: CallResult::Ok(true),
        }));
        assert!(state.logged_in);
        assert_eq!(state.label(), Some("QQ".to_string()));
    }

    #[test]
    fn test_failure_reads_as_logged_out() {
        let state = LoginState::resolve(&cap(Fixed {
            logged_in: CallResult::Failed("sdk missing".into()),
        }));
        assert_eq!(state, LoginState::default());
    }

    #[test]
    fn test_login_timeout_reads_as_logged_out() {
        let state = LoginState::login(
            &cap(Fixed {
                logged_in: CallResult::Ok(false),
            }),
            &LoginOptions::default(),
        );
        assert!(!state.logged_in);
    }

    #[test]
    fn test_env_login_without_variable() {
        let login = EnvLogin::new("REFLEX_TEST_UNSET_TOKEN_VAR", "REFLEX_TEST_UNSET_TYPE_VAR");
        assert_eq!(login.is_login(), CallResult::Ok(false));
        assert!(!login.login(&LoginOptions::default()).is_ok());
        assert_eq!(login.login_type(), Some("token".to_string()));
    }

    #[test]
    fn test_login_options_serialize_like_host() {
        let opts = LoginOptions {
            login_type: Some("weixin".into()),
            from: None,
            guide_word: Some("log in to save".into()),
        };
        let json = serde_json::to_string(&opts).unwrap();
        assert_eq!(json, r#"{"type":"weixin","guideWord":"log in to save"}"#);
    }
}
