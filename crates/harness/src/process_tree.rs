//! Sweeping processes that escaped a step's process group
//!
//! A script can move a child into a new session (`setsid`), which takes it out
//! of reach of a group kill. Every step is therefore started with a unique
//! marker in its environment, and after the step the process table is scanned
//! for anything descended from the step or still carrying its marker.

use std::sync::atomic::{AtomicU64, Ordering};

/// Environment variable carrying the step marker
pub(crate) const STEP_MARKER_VAR: &str = "IRGRADE_STEP";

/// Rescans after killing, in case a process forked between scan and kill
const SWEEP_PASSES: usize = 3;

static NEXT_STEP: AtomicU64 = AtomicU64::new(0);

/// A marker unique to one step of this harness process
pub(crate) fn next_marker() -> String {
    format!(
        "{}-{}",
        std::process::id(),
        NEXT_STEP.fetch_add(1, Ordering::Relaxed)
    )
}

/// SIGKILL every process carrying `marker`, plus its descendants and those of `root`
///
/// `root` must not have been reaped yet, or its pid may already belong to an
/// unrelated process. `root` itself is left to the caller. Returns the number
/// of signals sent.
#[cfg(unix)]
pub(crate) fn sweep(root: Option<u32>, marker: &str) -> usize {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use sysinfo::System;
    use tracing::debug;

    let mut killed = 0;
    for _ in 0..SWEEP_PASSES {
        let mut sys = System::new();
        sys.refresh_processes();

        let targets = collect_targets(&sys, root, marker);
        if targets.is_empty() {
            break;
        }
        for pid in targets {
            // Already-exited processes are fine
            if kill(Pid::from_raw(pid as i32), Signal::SIGKILL).is_ok() {
                killed += 1;
            }
        }
    }

    if killed > 0 {
        debug!(marker, killed, "Killed processes left behind by step");
    }
    killed
}

#[cfg(not(unix))]
pub(crate) fn sweep(_root: Option<u32>, _marker: &str) -> usize {
    0
}

#[cfg(unix)]
fn collect_targets(sys: &sysinfo::System, root: Option<u32>, marker: &str) -> Vec<u32> {
    use sysinfo::Pid;

    let tag = format!("{STEP_MARKER_VAR}={marker}");
    let own = std::process::id();

    let mut targets: Vec<u32> = sys
        .processes()
        .iter()
        .filter(|(_, process)| process.environ().iter().any(|var| *var == tag))
        .map(|(pid, _)| pid.as_u32())
        .collect();

    // Follow parent links too, for descendants that cleared their environment
    let mut frontier: Vec<Pid> = targets.iter().map(|pid| Pid::from_u32(*pid)).collect();
    frontier.extend(root.map(Pid::from_u32));
    while let Some(parent) = frontier.pop() {
        for (pid, process) in sys.processes() {
            if process.parent() == Some(parent) && !targets.contains(&pid.as_u32()) {
                targets.push(pid.as_u32());
                frontier.push(*pid);
            }
        }
    }

    targets.retain(|pid| Some(*pid) != root && *pid != own);
    targets.sort_unstable();
    targets.dedup();
    targets
}
