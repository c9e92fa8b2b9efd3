//! Shared vocabulary for talking to external collaborators (login host,
//! ranking service, feedback service).
//!
//! Every collaborator call resolves to a [`CallResult`]; every collaborator
//! handle is wrapped in a [`Capability`] decided once at startup.

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::error::{ReflexError, Result};

/// Tagged outcome of a single collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult<T> {
    Ok(T),
    TimedOut,
    Failed(String),
}

impl<T> CallResult<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            CallResult::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CallResult::Ok(_))
    }

    /// Log a non-ok result at the boundary and hand it back unchanged.
    pub fn logged(self, collaborator: &'static str) -> Self {
        match &self {
            CallResult::Ok(_) => {}
            CallResult::TimedOut => {
                warn!(collaborator = collaborator, "collaborator call timed out")
            }
            CallResult::Failed(reason) => {
                warn!(collaborator = collaborator, reason = %reason, "collaborator call failed")
            }
        }
        self
    }
}

impl<T> From<Result<T>> for CallResult<T> {
    fn from(res: Result<T>) -> Self {
        match res {
            Ok(v) => CallResult::Ok(v),
            Err(ReflexError::Timeout) => CallResult::TimedOut,
            Err(e) => CallResult::Failed(e.to_string()),
        }
    }
}

/// A collaborator that may or may not exist in the current host.
#[derive(Debug, Clone)]
pub enum Capability<T> {
    Available(T),
    Unavailable,
}

impl<T> Capability<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Capability::Available(v),
            None => Capability::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }
}

pub(crate) fn build_agent(timeout: Duration) -> ureq::Agent {
    let timeout = timeout.max(Duration::from_millis(100));
    ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .user_agent(concat!("reflex/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub(crate) fn post_json<B: Serialize, R: DeserializeOwned>(
    agent: &ureq::Agent,
    endpoint: &str,
    body: &B,
) -> Result<R> {
    let payload = serde_json::to_string(body)?;
    let response = agent
        .post(endpoint)
        .set("Content-Type", "application/json")
        .set("Accept", "application/json")
        .send_string(&payload)?;
    Ok(serde_json::from_reader(response.into_reader())?)
}
