//! One sandboxed run per submission attempt: deadline race, output capture,
//! and hand-off to the verifier.
//!
//! Invariants:
//!   - empty source never reaches the sandbox
//!   - every invocation captures into a fresh buffer (no residue across runs)
//!   - the output hook is restored on every path, success or not
//!   - overlapping submissions take turns on the sandbox; a run's hook can
//!     never be redirected or cleared by another run

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

use crate::domain::Challenge;
use crate::sandbox::{OutputHook, Sandbox};
use crate::verify::verify;

/// Outcome of a single coding submission. All variants are recoverable and
/// local to the attempt; resubmission is always allowed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
  /// Ran and matched the expected output (trim-only comparison).
  Success { output: String },
  /// Ran cleanly but did not match; carries the actual output for display.
  /// The expected value is deliberately not included.
  IncorrectOutput { output: String },
  /// Trimmed source was empty; the sandbox was never invoked.
  EmptyInput,
  /// The deadline elapsed before execution finished.
  Timeout,
  /// The sandbox reported a fault; message surfaced verbatim.
  RuntimeError { message: String },
}

/// The single long-lived sandbox plus the lease that grants each run
/// exclusive use of it. The hook slot on the sandbox is shared mutable
/// state, so hook install, execution, and hook restore must happen under
/// one holder at a time; concurrent submissions queue on the lease.
pub struct SharedSandbox {
  sandbox: Arc<dyn Sandbox>,
  lease: AsyncMutex<()>,
}

impl SharedSandbox {
  pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
    Self { sandbox, lease: AsyncMutex::new(()) }
  }
}

/// Drive one sandboxed run for `source` against `challenge.expected`.
///
/// Execution races a wall-clock deadline. If the deadline wins, the in-flight
/// run is dropped (the Python sandbox kills the child on drop) and `Timeout`
/// is reported. The deadline covers execution only, not time spent queued
/// behind another run.
#[instrument(level = "info", skip(shared, challenge, source), fields(challenge_id = challenge.id, source_len = source.len()))]
pub async fn run_submission(
  shared: &SharedSandbox,
  challenge: &Challenge,
  source: &str,
  deadline: Duration,
) -> RunOutcome {
  if source.trim().is_empty() {
    return RunOutcome::EmptyInput;
  }

  // Exclusive use for the whole run. Without it, a second run's hook install
  // would redirect this run's output, and either run's restore would clear
  // the other's hook mid-flight.
  let _lease = shared.lease.lock().await;
  let sandbox = shared.sandbox.as_ref();

  // Fresh buffer per invocation; interleaved attempts can never corrupt
  // each other's capture.
  let buffer = Arc::new(Mutex::new(String::new()));
  let sink = Arc::clone(&buffer);
  let hook: OutputHook = Arc::new(move |chunk: &str| {
    if let Ok(mut buf) = sink.lock() {
      buf.push_str(chunk);
    }
  });
  if let Err(e) = sandbox.set_output_hook(hook) {
    return RunOutcome::RuntimeError { message: e };
  }

  let outcome = match tokio::time::timeout(deadline, sandbox.execute(source)).await {
    Err(_elapsed) => {
      warn!(target: "challenge", id = challenge.id, deadline_secs = deadline.as_secs(), "execution deadline elapsed");
      RunOutcome::Timeout
    }
    Ok(Err(message)) => RunOutcome::RuntimeError { message },
    Ok(Ok(())) => {
      let output = buffer
        .lock()
        .map(|buf| buf.trim().to_string())
        .unwrap_or_default();
      if verify(challenge, &output).matched {
        info!(target: "challenge", id = challenge.id, "coding submission matched expected output");
        RunOutcome::Success { output }
      } else {
        RunOutcome::IncorrectOutput { output }
      }
    }
  };

  // Unconditional hook reset. A reset failure is logged and swallowed; the
  // primary outcome is already decided.
  if let Err(e) = sandbox.clear_output_hook() {
    warn!(target: "challenge", id = challenge.id, error = %e, "failed to restore sandbox output hook");
  }

  outcome
}
