//! Application session domain module.
//!
//! # Module Structure
//!
//! - `state`: tagged session state (`SessionState`) and transition results (`SessionOutcome`)
//! - `session`: the per-applicant state machine (`ApplicationSession`)

mod session;
mod state;

pub use session::ApplicationSession;
pub use state::{CANCEL_KEYWORD, PROCEED_KEYWORD, RejectReason, SessionOutcome, SessionState};
