//! Order lifecycle: state machine, orchestration and the error taxonomy.

pub mod error;
mod service;
mod state;

pub use error::{OrderError, OrderResult};
pub use service::{OrderService, TransitionExtra};
pub use state::OrderStateMachine;
