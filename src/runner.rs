//! Wraps a fallible check function and turns its error into a proper
//! service result instead of a stack trace.

use std::fmt::Debug;

use crate::{Resource, ServiceState};

/// Runs a check closure; on error the configured handler picks the
/// service state to report. Without a handler errors degrade to UNKNOWN,
/// matching how parse and conversion failures are treated throughout the
/// plugin code.
pub struct Runner<E> {
    on_error: Option<Box<dyn FnOnce(&E) -> ServiceState>>,
}

impl<E: Debug> Runner<E> {
    pub fn new() -> Self {
        Self { on_error: None }
    }

    pub fn on_error(mut self, f: impl FnOnce(&E) -> ServiceState + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn safe_run(self, f: impl FnOnce() -> Result<Resource, E>) -> RunnerResult<E> {
        match f() {
            Ok(resource) => RunnerResult::Ok(resource),
            Err(err) => {
                let state = self
                    .on_error
                    .map(|f| f(&err))
                    .unwrap_or(ServiceState::Unknown);
                RunnerResult::Err(state, err)
            }
        }
    }
}

impl<E: Debug> Default for Runner<E> {
    fn default() -> Self {
        Runner::new()
    }
}

/// Runs the given closure and reports the given state if the Result
/// contains an Err.
pub fn safe_run<E: Debug>(
    f: impl FnOnce() -> Result<Resource, E>,
    error_state: ServiceState,
) -> RunnerResult<E> {
    Runner::new().on_error(move |_| error_state).safe_run(f)
}

pub enum RunnerResult<E> {
    Ok(Resource),
    Err(ServiceState, E),
}

impl<E: Debug> RunnerResult<E> {
    pub fn print_and_exit(self) -> ! {
        match self {
            RunnerResult::Ok(resource) => resource.print_and_exit(),
            RunnerResult::Err(state, err) => {
                println!("{}: {:?}", state, err);
                std::process::exit(state.exit_code());
            }
        }
    }

    pub fn state(&self) -> ServiceState {
        match self {
            RunnerResult::Ok(resource) => resource.state(),
            RunnerResult::Err(state, _) => *state,
        }
    }
}
