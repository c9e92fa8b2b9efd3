use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collab::{build_agent, post_json, CallResult, Capability};
use crate::runtime::ReflexEvent;

/// Rank label and commentary for a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub rank: String,
    pub comment: String,
    #[serde(default)]
    pub tips: Option<String>,
}

/// Where the current session's feedback stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedbackStatus {
    /// No session has finished yet
    #[default]
    None,
    /// Request in flight
    Pending,
    Ready(Feedback),
    /// The collaborator failed, timed out or does not exist
    Unavailable,
}

impl FeedbackStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, FeedbackStatus::Pending)
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        match self {
            FeedbackStatus::Ready(f) => Some(f),
            _ => None,
        }
    }
}

/// External text generator that turns reaction times into commentary
pub trait FeedbackProvider: Send + Sync {
    fn request(&self, times: &[u64]) -> CallResult<Feedback>;
}

#[derive(Debug, Serialize)]
struct FeedbackRequestBody<'a> {
    times: &'a [u64],
}

/// Posts `{"times": [...]}` and expects `{"rank", "comment", "tips"?}` back
#[derive(Debug, Clone)]
pub struct HttpFeedbackProvider {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpFeedbackProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            agent: build_agent(timeout),
        }
    }
}

impl FeedbackProvider for HttpFeedbackProvider {
    fn request(&self, times: &[u64]) -> CallResult<Feedback> {
        debug!(endpoint = %self.endpoint, rounds = times.len(), "requesting feedback");
        post_json::<_, Feedback>(&self.agent, &self.endpoint, &FeedbackRequestBody { times }).into()
    }
}

/// Work order emitted by the game when a session completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRequest {
    pub session_id: u64,
    pub times: Vec<u64>,
}

/// Runs the request off the event loop and posts the answer back as
/// [`ReflexEvent::Feedback`]. Without a provider the failure is posted
/// immediately so the loading state still clears.
pub fn spawn_feedback_request(
    provider: &Capability<Arc<dyn FeedbackProvider>>,
    request: FeedbackRequest,
    tx: Sender<ReflexEvent>,
) {
    let FeedbackRequest { session_id, times } = request;
    match provider {
        Capability::Available(provider) => {
            let provider = Arc::clone(provider);
            thread::spawn(move || {
                let result = provider.request(&times).logged("feedback");
                let _ = tx.send(ReflexEvent::Feedback { session_id, result });
            });
        }
        Capability::Unavailable => {
            info!(session_id, "no feedback provider configured");
            let _ = tx.send(ReflexEvent::Feedback {
                session_id,
                result: CallResult::Failed("feedback provider unavailable".into()),
            });
        }
    }
}
