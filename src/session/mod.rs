//! Capture/analysis session
//!
//! [`state`] holds the session data and its transitions; [`controller`]
//! runs the asynchronous work that drives them.

pub mod controller;
pub mod state;

pub use controller::SessionController;
pub use state::{
    AnalysisRequest, OperationKind, OperationTicket, Session, SessionError, SessionEvent,
    SessionSnapshot, SessionState, SharedSession,
};
