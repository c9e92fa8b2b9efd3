use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::collab::CallResult;
use crate::delay::DelayGenerator;
use crate::feedback::{Feedback, FeedbackRequest, FeedbackStatus};
use crate::session::Session;
use crate::summary::{summarize, Summary};

/// Phase of the round in progress. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum RoundPhase {
    Idle,
    /// Cue armed, not yet shown
    Waiting,
    /// Cue shown, timing the response
    Active,
    /// Pressed before the cue; the round will be retried
    Early,
    /// Round recorded, waiting to start the next one
    RoundResult,
    SessionComplete,
}

/// The armed cue timer. Only exists while `Waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCue {
    pub id: u64,
    pub armed_at: Instant,
    pub fire_at: Instant,
}

impl PendingCue {
    pub fn delay(&self) -> Duration {
        self.fire_at.duration_since(self.armed_at)
    }
}

/// What a primary interaction did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// New session, first cue armed
    Started,
    /// Cue armed for the current round (retry or next round)
    Armed,
    /// Pressed during `Waiting`
    Early,
    /// Reaction recorded, more rounds to go
    Recorded { ms: u64 },
    /// Last reaction recorded; the caller dispatches the feedback request
    Completed { ms: u64, request: FeedbackRequest },
    Ignored,
}

/// Round state machine for one player
#[derive(Debug)]
pub struct ReflexGame {
    phase: RoundPhase,
    session: Session,
    delays: DelayGenerator,
    pending_cue: Option<PendingCue>,
    activated_at: Option<Instant>,
    feedback: FeedbackStatus,
    total_rounds: usize,
    next_session_id: u64,
    next_cue_id: u64,
}

impl ReflexGame {
    pub fn new(total_rounds: usize, delays: DelayGenerator) -> Self {
        Self {
            phase: RoundPhase::Idle,
            session: Session::new(0, total_rounds),
            delays,
            pending_cue: None,
            activated_at: None,
            feedback: FeedbackStatus::None,
            total_rounds,
            next_session_id: 1,
            next_cue_id: 1,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn times(&self) -> &[u64] {
        self.session.times()
    }

    pub fn round_index(&self) -> usize {
        self.session.round_index()
    }

    pub fn total_rounds(&self) -> usize {
        self.session.total_rounds()
    }

    pub fn pending_cue(&self) -> Option<&PendingCue> {
        self.pending_cue.as_ref()
    }

    pub fn feedback(&self) -> &FeedbackStatus {
        &self.feedback
    }

    /// Only defined once the session is complete
    pub fn summary(&self) -> Option<Summary> {
        match self.phase {
            RoundPhase::SessionComplete => summarize(self.session.times()),
            _ => None,
        }
    }

    /// Pointer press or Enter
    pub fn interact(&mut self, now: Instant) -> Transition {
        match self.phase {
            RoundPhase::Idle => {
                self.start_session();
                self.arm_cue(now);
                Transition::Started
            }
            RoundPhase::Waiting => {
                self.cancel_cue();
                self.phase = RoundPhase::Early;
                debug!(round = self.round_index(), "pressed before cue");
                Transition::Early
            }
            RoundPhase::Early | RoundPhase::RoundResult => {
                self.arm_cue(now);
                Transition::Armed
            }
            RoundPhase::Active => self.record_reaction(now),
            RoundPhase::SessionComplete => Transition::Ignored,
        }
    }

    /// Space bar; same as [`interact`](Self::interact) except it never
    /// acts on the summary screen
    pub fn secondary(&mut self, now: Instant) -> Transition {
        match self.phase {
            RoundPhase::SessionComplete => Transition::Ignored,
            _ => self.interact(now),
        }
    }

    /// Id of the pending cue if its deadline has passed
    pub fn due_cue(&self, now: Instant) -> Option<u64> {
        self.pending_cue
            .filter(|cue| now >= cue.fire_at)
            .map(|cue| cue.id)
    }

    /// Show the cue. A fire for a cancelled or replaced cue, or outside
    /// `Waiting`, is dropped and returns false.
    pub fn fire_cue(&mut self, cue_id: u64, now: Instant) -> bool {
        let matches = self.pending_cue.map(|c| c.id) == Some(cue_id);
        if self.phase != RoundPhase::Waiting || !matches {
            debug!(cue_id, phase = %self.phase, "ignoring stale cue");
            return false;
        }
        self.pending_cue = None;
        self.activated_at = Some(now);
        self.phase = RoundPhase::Active;
        true
    }

    /// Drop the session and any feedback and return to `Idle`
    pub fn reset(&mut self) {
        self.cancel_cue();
        self.activated_at = None;
        self.session = Session::new(self.take_session_id(), self.total_rounds);
        self.feedback = FeedbackStatus::None;
        self.phase = RoundPhase::Idle;
    }

    /// Apply a feedback response. Responses for any session other than the
    /// current completed one are discarded; returns whether it was applied.
    pub fn attach_feedback(&mut self, session_id: u64, result: CallResult<Feedback>) -> bool {
        if session_id != self.session.id() || !self.feedback.is_pending() {
            debug!(
                session_id,
                current = self.session.id(),
                "discarding stale feedback"
            );
            return false;
        }
        self.feedback = match result {
            CallResult::Ok(feedback) => FeedbackStatus::Ready(feedback),
            CallResult::TimedOut | CallResult::Failed(_) => FeedbackStatus::Unavailable,
        };
        true
    }

    fn start_session(&mut self) {
        self.session = Session::new(self.take_session_id(), self.total_rounds);
        self.feedback = FeedbackStatus::None;
        self.activated_at = None;
        info!(session_id = self.session.id(), rounds = self.total_rounds, "session started");
    }

    fn take_session_id(&mut self) -> u64 {
        let id = self.next_session_id;
        self.next_session_id += 1;
        id
    }

    fn arm_cue(&mut self, now: Instant) {
        self.cancel_cue();
        let delay = self.delays.next_delay();
        let cue = PendingCue {
            id: self.next_cue_id,
            armed_at: now,
            fire_at: now + delay,
        };
        self.next_cue_id += 1;
        debug!(
            cue_id = cue.id,
            delay_ms = cue.delay().as_millis() as u64,
            round = self.round_index(),
            "cue armed"
        );
        self.pending_cue = Some(cue);
        self.phase = RoundPhase::Waiting;
    }

    fn cancel_cue(&mut self) {
        if let Some(cue) = self.pending_cue.take() {
            debug!(cue_id = cue.id, "cue cancelled");
        }
    }

    fn record_reaction(&mut self, now: Instant) -> Transition {
        let Some(activated_at) = self.activated_at.take() else {
            warn!("active phase without activation timestamp");
            return Transition::Ignored;
        };
        let ms = now.saturating_duration_since(activated_at).as_millis() as u64;

        if !self.session.append(ms) {
            warn!(session_id = self.session.id(), "session already full");
            return Transition::Ignored;
        }

        if self.session.is_complete() {
            self.phase = RoundPhase::SessionComplete;
            self.feedback = FeedbackStatus::Pending;
            info!(
                session_id = self.session.id(),
                times = ?self.session.times(),
                "session complete"
            );
            Transition::Completed {
                ms,
                request: FeedbackRequest {
                    session_id: self.session.id(),
                    times: self.session.times().to_vec(),
                },
            }
        } else {
            self.phase = RoundPhase::RoundResult;
            Transition::Recorded { ms }
        }
    }
}
