use anyhow::anyhow;

use checkkit::{Resource, Runner, ServiceState};

// A failing check should not page anyone just because the agent output
// was broken: the runner reports UNKNOWN for errors. The handler below
// shows how to pick a different state for specific cases.

fn main() {
    Runner::new()
        .on_error(|_| ServiceState::Unknown)
        .safe_run(do_check)
        .print_and_exit()
}

fn do_check() -> Result<Resource, anyhow::Error> {
    Err(anyhow!("agent output was truncated"))
}
