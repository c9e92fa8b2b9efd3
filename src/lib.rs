// Library surface for the binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod collab;
pub mod config;
pub mod delay;
pub mod error;
pub mod feedback;
pub mod logging;
pub mod login;
pub mod ranking;
pub mod round;
pub mod runtime;
pub mod session;
pub mod store;
pub mod summary;
pub mod ui;

pub use app::{App, Collaborators, Flow};
pub use round::{ReflexGame, RoundPhase, Transition};
