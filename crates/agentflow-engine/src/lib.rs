//! Agentflow Engine
//!
//! The [`Simulator`] drives a workflow run: it fixes the node order once through
//! the resolver, executes each node through the handler registry one at a time,
//! checks every output against the constitution and appends what happened to
//! the session log.
//!
//! Runs halt on the first handler failure (`Failed`) or blocking violation
//! (`Aborted`). Structural problems such as a missing start node are returned as
//! errors before anything is recorded.

mod error;
mod events;
mod report;
mod session;
mod simulator;

pub use error::SimulationError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use report::{HaltReason, RunReport};
pub use session::{ExecutionSession, ExecutionStep, RunStatus, RunSummary, StepStatus};
pub use simulator::{Simulator, SimulatorConfig};
