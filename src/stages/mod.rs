//! Build steps
//!
//! A build is an ordered list of steps. Each step has a forward action and
//! a cleanup action. Steps run in order until one halts; afterwards every
//! step that started is cleaned up exactly once, in reverse order.

pub mod create_template;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::BuilderError;
use crate::state::BuildState;

/// Outcome of a step's forward action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Proceed to the next step
    Continue,
    /// Stop the build; cleanup follows
    Halt,
}

/// A single build step
#[async_trait]
pub trait Step: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    /// Forward action
    async fn run(&self, state: &mut BuildState) -> StepAction;

    /// Undo what `run` left behind. Must not fail.
    async fn cleanup(&self, state: &mut BuildState);
}

/// Record `err` as the reason the build stopped, report it and halt
pub fn halt_with_error(state: &mut BuildState, err: BuilderError) -> StepAction {
    state.ui.error(&err.to_string());
    state.error = Some(err);
    StepAction::Halt
}

/// Run steps in order, then clean up every step that started
///
/// Returns the error recorded by the halting step, if any.
pub async fn run_steps(steps: &[Box<dyn Step>], state: &mut BuildState) -> Result<(), BuilderError> {
    let mut started = 0;
    let mut halted_by = None;

    for step in steps {
        info!("Starting step: {}", step.name());
        started += 1;

        match step.run(state).await {
            StepAction::Continue => info!("Completed step: {}", step.name()),
            StepAction::Halt => {
                warn!("Step {} halted the build", step.name());
                halted_by = Some(step.name());
                break;
            }
        }
    }

    for step in steps[..started].iter().rev() {
        debug!("Cleaning up step: {}", step.name());
        step.cleanup(state).await;
    }

    match (halted_by, state.error.take()) {
        (_, Some(err)) => Err(err),
        (Some(name), None) => Err(BuilderError::halted(name, "halted without an error")),
        (None, None) => Ok(()),
    }
}
