use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind};
use tracing::{debug, info};

use crate::collab::{CallResult, Capability};
use crate::config::Config;
use crate::delay::DelayGenerator;
use crate::feedback::{spawn_feedback_request, FeedbackProvider, HttpFeedbackProvider};
use crate::login::{EnvLogin, LoginOptions, LoginProvider, LoginState};
use crate::ranking::{
    spawn_ranking_submission, HttpRankingClient, RankingClient, RankingSnapshot, RankingStatus,
};
use crate::round::{ReflexGame, RoundPhase, Transition};
use crate::runtime::ReflexEvent;
use crate::store::{BestScoreStore, SessionRecord};
use crate::summary::{score_from_reaction_time, Summary};

/// External collaborators, each resolved once at startup
#[derive(Clone)]
pub struct Collaborators {
    pub login: Capability<Arc<dyn LoginProvider>>,
    pub ranking: Capability<Arc<dyn RankingClient>>,
    pub feedback: Capability<Arc<dyn FeedbackProvider>>,
}

impl Collaborators {
    pub fn unavailable() -> Self {
        Self {
            login: Capability::Unavailable,
            ranking: Capability::Unavailable,
            feedback: Capability::Unavailable,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let env_login = EnvLogin::new(&config.credential_env, &config.login_type_env);
        let credential = env_login.credential();

        let ranking: Capability<Arc<dyn RankingClient>> = if config.submit_scores {
            Capability::Available(Arc::new(HttpRankingClient::new(
                &config.ranking_url,
                &config.activity_id,
                credential,
                config.http_timeout(),
            )))
        } else {
            Capability::Unavailable
        };

        let feedback = Capability::from_option(config.feedback_url.as_ref().map(|url| {
            Arc::new(HttpFeedbackProvider::new(url, config.http_timeout()))
                as Arc<dyn FeedbackProvider>
        }));

        Self {
            login: Capability::Available(Arc::new(env_login)),
            ranking,
            feedback,
        }
    }
}

/// How many past sessions the idle screen lists
pub const RECENT_SESSIONS: usize = 3;

/// Result of handling one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Redraw,
    Skip,
    Quit,
}

pub struct App {
    pub game: ReflexGame,
    pub config: Config,
    pub login: LoginState,
    pub ranking: RankingStatus,
    pub best: Option<u64>,
    pub new_best: bool,
    pub sessions_played: u64,
    pub recent: Vec<SessionRecord>,
    collaborators: Collaborators,
    store: Box<dyn BestScoreStore>,
    events: Sender<ReflexEvent>,
}

impl App {
    pub fn new(
        config: Config,
        delays: DelayGenerator,
        collaborators: Collaborators,
        store: Box<dyn BestScoreStore>,
        events: Sender<ReflexEvent>,
    ) -> Self {
        let login = LoginState::resolve(&collaborators.login);
        info!(logged_in = login.logged_in, login_type = ?login.login_type, "login resolved");
        info!(
            ranking = collaborators.ranking.is_available(),
            feedback = collaborators.feedback.is_available(),
            "collaborators resolved"
        );
        Self {
            game: ReflexGame::new(config.total_rounds, delays),
            best: store.get_best(),
            sessions_played: store.session_count(),
            recent: store.recent_sessions(RECENT_SESSIONS),
            config,
            login,
            ranking: RankingStatus::NotSubmitted,
            new_best: false,
            collaborators,
            store,
            events,
        }
    }

    pub fn summary(&self) -> Option<Summary> {
        self.game.summary()
    }

    /// The cue deadline is checked on every event, not only on idle ticks,
    /// so a stream of mouse motion cannot hold the cue back.
    pub fn handle_event(&mut self, event: ReflexEvent, now: Instant) -> Flow {
        let fired = self.fire_due_cue(now);
        let flow = match event {
            ReflexEvent::Tick => Flow::Skip,
            ReflexEvent::Resize => Flow::Redraw,
            ReflexEvent::Key(key) => self.on_key(key, now),
            ReflexEvent::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    let transition = self.game.interact(now);
                    self.apply(transition)
                }
                _ => Flow::Skip,
            },
            ReflexEvent::Feedback { session_id, result } => {
                if self.game.attach_feedback(session_id, result) {
                    Flow::Redraw
                } else {
                    Flow::Skip
                }
            }
            ReflexEvent::Ranking { session_id, result } => self.on_ranking(session_id, result),
        };
        match flow {
            Flow::Skip if fired => Flow::Redraw,
            flow => flow,
        }
    }

    fn fire_due_cue(&mut self, now: Instant) -> bool {
        self.game
            .due_cue(now)
            .is_some_and(|cue_id| self.game.fire_cue(cue_id, now))
    }

    fn on_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        if key.kind == KeyEventKind::Release {
            return Flow::Skip;
        }
        match key.code {
            KeyCode::Esc => Flow::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Flow::Quit,
            KeyCode::Enter => {
                let transition = self.game.interact(now);
                self.apply(transition)
            }
            KeyCode::Char(' ') => {
                let transition = self.game.secondary(now);
                self.apply(transition)
            }
            KeyCode::Char('r') => {
                self.reset();
                Flow::Redraw
            }
            KeyCode::Char('l') if self.game.phase() == RoundPhase::Idle => {
                self.login = LoginState::login(&self.collaborators.login, &LoginOptions::default());
                Flow::Redraw
            }
            _ => Flow::Skip,
        }
    }

    /// Abandon the current session (or leave the summary) and go back to idle
    pub fn reset(&mut self) {
        self.game.reset();
        self.ranking = RankingStatus::NotSubmitted;
        self.new_best = false;
    }

    fn apply(&mut self, transition: Transition) -> Flow {
        match transition {
            Transition::Ignored => Flow::Skip,
            Transition::Started => {
                self.ranking = RankingStatus::NotSubmitted;
                self.new_best = false;
                Flow::Redraw
            }
            Transition::Armed | Transition::Early | Transition::Recorded { .. } => Flow::Redraw,
            Transition::Completed { request, .. } => {
                let session_id = request.session_id;
                spawn_feedback_request(&self.collaborators.feedback, request, self.events.clone());
                self.finish_session(session_id);
                Flow::Redraw
            }
        }
    }

    fn finish_session(&mut self, session_id: u64) {
        let Some(summary) = self.game.summary() else {
            return;
        };

        self.store.record_session(self.game.times(), &summary);
        self.sessions_played = self.store.session_count();
        self.recent = self.store.recent_sessions(RECENT_SESSIONS);
        self.new_best = self.store.set_best_if_lower(summary.fastest);
        self.best = self.store.get_best().or(Some(summary.fastest));

        self.ranking = if !self.config.submit_scores {
            RankingStatus::Disabled
        } else if !self.login.logged_in {
            RankingStatus::LoggedOut
        } else {
            let score = score_from_reaction_time(summary.average);
            debug!(session_id, score, "submitting session average");
            spawn_ranking_submission(
                &self.collaborators.ranking,
                session_id,
                score,
                self.config.ranking_size,
                self.events.clone(),
            );
            RankingStatus::Submitting
        };
    }

    fn on_ranking(&mut self, session_id: u64, result: CallResult<RankingSnapshot>) -> Flow {
        if session_id != self.game.session().id() || self.ranking != RankingStatus::Submitting {
            debug!(session_id, "discarding stale ranking response");
            return Flow::Skip;
        }
        self.ranking = match result {
            CallResult::Ok(snapshot) => RankingStatus::Ready(snapshot),
            CallResult::TimedOut | CallResult::Failed(_) => RankingStatus::Failed,
        };
        Flow::Redraw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::DelayRange;
    use crate::feedback::{Feedback, FeedbackStatus};
    use crate::store::MemoryStore;
    use crossterm::event::{KeyEventState, MouseEvent};
    use std::sync::mpsc::{self, Receiver};
    use std::time::Duration;

    struct LoggedIn;

    impl LoginProvider for LoggedIn {
        fn is_login(&self) -> CallResult<bool> {
            CallResult::Ok(true)
        }
        fn login(&self, _options: &LoginOptions) -> CallResult<bool> {
            CallResult::Ok(true)
        }
        fn login_type(&self) -> Option<String> {
            Some("weixin".into())
        }
    }

    struct FixedBoard;

    impl RankingClient for FixedBoard {
        fn submit(&self, score: u64, _board_size: usize) -> CallResult<RankingSnapshot> {
            CallResult::Ok(RankingSnapshot {
                ranking_size: 1,
                best_rank: crate::ranking::Ranking { score, rank: 1 },
                ..RankingSnapshot::default()
            })
        }
    }

    fn app_with(collaborators: Collaborators, rounds: usize) -> (App, Receiver<ReflexEvent>) {
        let (tx, rx) = mpsc::channel();
        let config = Config {
            total_rounds: rounds,
            ..Config::default()
        };
        let app = App::new(
            config,
            DelayGenerator::seeded(DelayRange::default(), 3),
            collaborators,
            Box::new(MemoryStore::default()),
            tx,
        );
        (app, rx)
    }

    fn key(code: KeyCode) -> ReflexEvent {
        ReflexEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn click() -> ReflexEvent {
        ReflexEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        })
    }

    /// Tick at the cue deadline and return it
    fn tick_to_cue(app: &mut App) -> Instant {
        let fire_at = app.game.pending_cue().unwrap().fire_at;
        assert_eq!(app.handle_event(ReflexEvent::Tick, fire_at), Flow::Redraw);
        fire_at
    }

    fn play_round(app: &mut App, ms: u64) {
        let shown = tick_to_cue(app);
        assert_eq!(app.game.phase(), RoundPhase::Active);
        app.handle_event(click(), shown + Duration::from_millis(ms));
    }

    #[test]
    fn test_tick_before_deadline_does_nothing() {
        let (mut app, _rx) = app_with(Collaborators::unavailable(), 3);
        let t0 = Instant::now();
        app.handle_event(key(KeyCode::Enter), t0);
        assert_eq!(app.handle_event(ReflexEvent::Tick, t0), Flow::Skip);
        assert_eq!(app.game.phase(), RoundPhase::Waiting);
    }

    fn motion(column: u16) -> ReflexEvent {
        ReflexEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Moved,
            column,
            row: 0,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_mouse_motion_past_deadline_fires_cue() {
        let (mut app, _rx) = app_with(Collaborators::unavailable(), 3);
        app.handle_event(key(KeyCode::Enter), Instant::now());
        let fire_at = app.game.pending_cue().unwrap().fire_at;

        // a steady stream of motion, never an idle tick
        assert_eq!(app.handle_event(motion(0), fire_at - Duration::from_millis(5)), Flow::Skip);
        assert_eq!(app.game.phase(), RoundPhase::Waiting);
        let shown = fire_at + Duration::from_millis(5);
        assert_eq!(app.handle_event(motion(1), shown), Flow::Redraw);
        assert_eq!(app.game.phase(), RoundPhase::Active);
        for col in 2..2000 {
            app.handle_event(motion(col), shown + Duration::from_millis(1));
        }
        assert_eq!(app.game.phase(), RoundPhase::Active);

        app.handle_event(click(), shown + Duration::from_millis(240));
        assert_eq!(app.game.phase(), RoundPhase::RoundResult);
        assert_eq!(app.game.times(), &[240]);
    }

    #[test]
    fn test_click_after_deadline_is_not_early() {
        let (mut app, _rx) = app_with(Collaborators::unavailable(), 3);
        app.handle_event(key(KeyCode::Enter), Instant::now());
        let fire_at = app.game.pending_cue().unwrap().fire_at;

        app.handle_event(click(), fire_at + Duration::from_secs(3));
        assert_eq!(app.game.phase(), RoundPhase::RoundResult);
        assert_eq!(app.game.times().len(), 1);
    }

    #[test]
    fn test_escape_quits() {
        let (mut app, _rx) = app_with(Collaborators::unavailable(), 3);
        assert_eq!(app.handle_event(key(KeyCode::Esc), Instant::now()), Flow::Quit);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let (mut app, _rx) = app_with(Collaborators::unavailable(), 3);
        let release = KeyEvent {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(app.handle_event(ReflexEvent::Key(release), Instant::now()), Flow::Skip);
        assert_eq!(app.game.phase(), RoundPhase::Idle);
    }

    #[test]
    fn test_session_without_collaborators() {
        let (mut app, rx) = app_with(Collaborators::unavailable(), 2);
        let t0 = Instant::now();
        app.handle_event(click(), t0);
        play_round(&mut app, 210);
        app.handle_event(key(KeyCode::Char(' ')), Instant::now());
        play_round(&mut app, 190);

        assert_eq!(app.game.phase(), RoundPhase::SessionComplete);
        assert_eq!(app.best, Some(190));
        assert!(app.new_best);
        assert_eq!(app.sessions_played, 1);
        assert_eq!(app.recent.len(), 1);
        assert_eq!(app.recent[0].average, 200);
        // logged out by default
        assert_eq!(app.ranking, RankingStatus::LoggedOut);

        // the missing feedback provider answers immediately with a failure
        let ev = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(app.handle_event(ev, Instant::now()), Flow::Redraw);
        assert_eq!(app.game.feedback(), &FeedbackStatus::Unavailable);
    }

    #[test]
    fn test_space_ignored_on_summary_and_r_resets() {
        let (mut app, _rx) = app_with(Collaborators::unavailable(), 1);
        app.handle_event(click(), Instant::now());
        play_round(&mut app, 250);
        assert_eq!(
            app.handle_event(key(KeyCode::Char(' ')), Instant::now()),
            Flow::Skip
        );
        assert_eq!(app.game.phase(), RoundPhase::SessionComplete);

        app.handle_event(key(KeyCode::Char('r')), Instant::now());
        assert_eq!(app.game.phase(), RoundPhase::Idle);
        assert_eq!(app.ranking, RankingStatus::NotSubmitted);
    }

    #[test]
    fn test_logged_in_session_submits_average() {
        let collaborators = Collaborators {
            login: Capability::Available(Arc::new(LoggedIn)),
            ranking: Capability::Available(Arc::new(FixedBoard)),
            feedback: Capability::Unavailable,
        };
        let (mut app, rx) = app_with(collaborators, 1);
        assert!(app.login.logged_in);
        assert_eq!(app.login.label(), Some("WEIXIN".into()));

        app.handle_event(click(), Instant::now());
        play_round(&mut app, 250);
        assert_eq!(app.ranking, RankingStatus::Submitting);

        for _ in 0..2 {
            let ev = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            app.handle_event(ev, Instant::now());
        }
        match &app.ranking {
            RankingStatus::Ready(snapshot) => assert_eq!(snapshot.best_rank.score, 99_750),
            other => panic!("unexpected ranking status {:?}", other),
        }
    }

    #[test]
    fn test_submission_disabled_by_config() {
        let (tx, _rx) = mpsc::channel();
        let config = Config {
            total_rounds: 1,
            submit_scores: false,
            ..Config::default()
        };
        let mut app = App::new(
            config,
            DelayGenerator::default(),
            Collaborators::unavailable(),
            Box::new(MemoryStore::default()),
            tx,
        );
        app.handle_event(click(), Instant::now());
        play_round(&mut app, 300);
        assert_eq!(app.ranking, RankingStatus::Disabled);
    }

    #[test]
    fn test_stale_ranking_response_ignored() {
        let (mut app, _rx) = app_with(Collaborators::unavailable(), 1);
        app.handle_event(click(), Instant::now());
        play_round(&mut app, 300);
        let old = app.game.session().id();
        app.reset();

        let flow = app.handle_event(
            ReflexEvent::Ranking {
                session_id: old,
                result: CallResult::Ok(RankingSnapshot::default()),
            },
            Instant::now(),
        );
        assert_eq!(flow, Flow::Skip);
        assert_eq!(app.ranking, RankingStatus::NotSubmitted);
    }

    #[test]
    fn test_stale_feedback_after_reset() {
        let (mut app, _rx) = app_with(Collaborators::unavailable(), 1);
        app.handle_event(click(), Instant::now());
        play_round(&mut app, 300);
        let old = app.game.session().id();
        app.handle_event(key(KeyCode::Char('r')), Instant::now());
        app.handle_event(click(), Instant::now());

        let fb = Feedback {
            rank: "Silver".into(),
            comment: "late".into(),
            tips: None,
        };
        app.handle_event(
            ReflexEvent::Feedback {
                session_id: old,
                result: CallResult::Ok(fb),
            },
            Instant::now(),
        );
        assert_eq!(app.game.feedback(), &FeedbackStatus::None);
    }

    #[test]
    fn test_login_key_on_idle() {
        let collaborators = Collaborators {
            login: Capability::Available(Arc::new(LoggedIn)),
            ..Collaborators::unavailable()
        };
        let (mut app, _rx) = app_with(collaborators, 3);
        app.login = LoginState::default();
        app.handle_event(key(KeyCode::Char('l')), Instant::now());
        assert!(app.login.logged_in);
    }
}
