use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collab::{build_agent, post_json, CallResult, Capability};
use crate::error::{ReflexError, Result};
use crate::runtime::ReflexEvent;

pub const DEFAULT_RANKING_URL: &str = "https://dev.inews.qq.com/activity/ranking";
pub const DEFAULT_ACTIVITY_ID: &str = "activity_reflex_test";
pub const DEFAULT_BOARD_SIZE: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub nick: String,
    #[serde(default)]
    pub head_url: String,
    #[serde(default)]
    pub suid: String,
    #[serde(default)]
    pub openid: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub score: u64,
    pub rank: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEntry {
    pub ranking: Ranking,
    pub user_info: UserInfo,
}

/// Leaderboard state returned after a submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingSnapshot {
    /// Total participants
    pub ranking_size: u64,
    #[serde(default)]
    pub less_score_count: u64,
    /// Caller's historical best
    pub best_rank: Ranking,
    #[serde(default)]
    pub ranking_board: Vec<BoardEntry>,
}

#[derive(Debug, Deserialize)]
struct RankingEnvelope {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<RankingSnapshot>,
}

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    activity_id: &'a str,
    ranking_size: usize,
    score: u64,
    bkn_sign: u64,
}

/// Remote leaderboard
pub trait RankingClient: Send + Sync {
    fn submit(&self, score: u64, board_size: usize) -> CallResult<RankingSnapshot>;
}

/// djb2 over the credential. The endpoint expects this field but it is a
/// placeholder, not a signature anyone should rely on.
///
/// Arithmetic wraps in `i32` at every step. The web client only truncates
/// on the shift and adds in doubles, so the two agree for short ASCII seeds
/// and drift apart once the running hash leaves the `i32` range.
pub fn demo_sign(seed: &str) -> u64 {
    let hash = seed
        .chars()
        .fold(5381i32, |h, c| h.wrapping_shl(5).wrapping_add(h).wrapping_add(c as i32));
    hash.unsigned_abs() as u64
}

#[derive(Debug, Clone)]
pub struct HttpRankingClient {
    endpoint: String,
    activity_id: String,
    credential: Option<String>,
    agent: ureq::Agent,
}

impl HttpRankingClient {
    pub fn new(
        endpoint: impl Into<String>,
        activity_id: impl Into<String>,
        credential: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            activity_id: activity_id.into(),
            credential,
            agent: build_agent(timeout),
        }
    }

    fn try_submit(&self, score: u64, board_size: usize) -> Result<RankingSnapshot> {
        let credential = self
            .credential
            .as_deref()
            .ok_or(ReflexError::MissingCredential)?;
        let body = SubmitBody {
            activity_id: &self.activity_id,
            ranking_size: board_size,
            score,
            bkn_sign: demo_sign(credential),
        };
        debug!(endpoint = %self.endpoint, score, board_size, "submitting score");
        let envelope: RankingEnvelope = post_json(&self.agent, &self.endpoint, &body)?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope(envelope: RankingEnvelope) -> Result<RankingSnapshot> {
    match (envelope.code, envelope.data) {
        (0, Some(data)) => Ok(data),
        (code, _) => Err(ReflexError::Rejected {
            code,
            msg: envelope.msg,
        }),
    }
}

impl RankingClient for HttpRankingClient {
    fn submit(&self, score: u64, board_size: usize) -> CallResult<RankingSnapshot> {
        self.try_submit(score, board_size).into()
    }
}

/// Where the current session's leaderboard submission stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RankingStatus {
    #[default]
    NotSubmitted,
    /// Submission is gated on login
    LoggedOut,
    Disabled,
    Submitting,
    Ready(RankingSnapshot),
    Failed,
}

/// Submit off the event loop and post the result back as
/// [`ReflexEvent::Ranking`]
pub fn spawn_ranking_submission(
    client: &Capability<Arc<dyn RankingClient>>,
    session_id: u64,
    score: u64,
    board_size: usize,
    tx: Sender<ReflexEvent>,
) {
    match client {
        Capability::Available(client) => {
            let client = Arc::clone(client);
            thread::spawn(move || {
                let result = client.submit(score, board_size).logged("ranking");
                let _ = tx.send(ReflexEvent::Ranking { session_id, result });
            });
        }
        Capability::Unavailable => {
            info!(session_id, "no ranking client configured");
            let _ = tx.send(ReflexEvent::Ranking {
                session_id,
                result: CallResult::Failed("ranking client unavailable".into()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::test_server::respond_once;
    use assert_matches::assert_matches;

    const BOARD_REPLY: &str = r#"{
        "code": 0,
        "msg": "ok",
        "data": {
            "ranking_size": 120,
            "less_score_count": 80,
            "best_rank": {"score": 99800, "rank": 3},
            "ranking_board": [
                {"ranking": {"score": 99850, "rank": 1},
                 "user_info": {"nick": "kim", "head_url": "", "suid": "s1", "openid": "o1"}}
            ]
        }
    }"#;

    fn client(url: &str) -> HttpRankingClient {
        HttpRankingClient::new(
            url,
            DEFAULT_ACTIVITY_ID,
            Some("abc".into()),
            Duration::from_secs(2),
        )
    }

    #[test]
    fn test_demo_sign_matches_reference_values() {
        assert_eq!(demo_sign(""), 5381);
        // 5381 * 33 + 'a'
        assert_eq!(demo_sign("a"), 177_670);
        assert_eq!(demo_sign("abc"), 193_485_963);
    }

    #[test]
    fn test_demo_sign_wraps_on_long_seeds() {
        assert_eq!(demo_sign(&"x".repeat(64)), 1_854_143_237);
        assert_eq!(demo_sign("session-token-1234"), 1_043_458_610);
    }

    #[test]
    fn test_missing_credential_is_failure() {
        let client = HttpRankingClient::new(
            "http://127.0.0.1:9/ranking",
            DEFAULT_ACTIVITY_ID,
            None,
            Duration::from_millis(200),
        );
        assert_eq!(
            client.submit(99_750, 10),
            CallResult::Failed("no session credential available".into())
        );
    }

    #[test]
    fn test_submit_over_http() {
        let (url, server) = respond_once(200, BOARD_REPLY);
        let snapshot = client(&url).submit(99_750, 10).ok().unwrap();
        assert_eq!(snapshot.best_rank, Ranking { score: 99_800, rank: 3 });
        assert_eq!(snapshot.ranking_board[0].user_info.nick, "kim");

        let sent: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({
                "activity_id": "activity_reflex_test",
                "ranking_size": 10,
                "score": 99_750,
                "bkn_sign": 193_485_963,
            })
        );
    }

    #[test]
    fn test_rejected_submission_over_http() {
        let (url, server) =
            respond_once(200, r#"{"code": 1001, "msg": "bad sign", "data": null}"#);
        assert_eq!(
            client(&url).submit(99_750, 10),
            CallResult::Failed("submission rejected (code=1001): bad sign".into())
        );
        server.join().unwrap();
    }

    #[test]
    fn test_envelope_parsing() {
        let env: RankingEnvelope = serde_json::from_str(BOARD_REPLY).unwrap();
        let snap = unwrap_envelope(env).unwrap();
        assert_eq!(snap.ranking_size, 120);
        assert_eq!(snap.best_rank.rank, 3);
        assert_eq!(snap.ranking_board.len(), 1);
        assert_eq!(snap.ranking_board[0].user_info.nick, "kim");
    }

    #[test]
    fn test_nonzero_code_is_rejection() {
        let env: RankingEnvelope =
            serde_json::from_str(r#"{"code": 1001, "msg": "bad sign", "data": null}"#).unwrap();
        assert_matches!(
            unwrap_envelope(env),
            Err(ReflexError::Rejected { code: 1001, .. })
        );
    }

    #[test]
    fn test_submit_body_shape() {
        let body = SubmitBody {
            activity_id: DEFAULT_ACTIVITY_ID,
            ranking_size: 10,
            score: 99_750,
            bkn_sign: 5381,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["activity_id"], "activity_reflex_test");
        assert_eq!(v["score"], 99_750);
        assert_eq!(v["bkn_sign"], 5381);
    }
}
