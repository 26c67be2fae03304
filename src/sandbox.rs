//! Code execution sandbox: the external contract plus the Python child-process
//! implementation.
//!
//! The contract mirrors an embedded interpreter with an interceptable stdout:
//! callers install an output hook, run one source snippet, and restore the
//! hook afterwards. The sandbox imposes no time limit of its own; the
//! orchestrator supplies the deadline.

use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, instrument};

/// Receives captured stdout text incrementally (line-sized chunks).
pub type OutputHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Contract for running one untrusted snippet with stdout capture.
///
/// Faults are reported as human-readable message strings; the message is
/// surfaced verbatim to the user.
#[async_trait]
pub trait Sandbox: Send + Sync {
  /// Run one source snippet to completion. Captured stdout flows into the
  /// installed hook; without a hook the output is discarded.
  async fn execute(&self, source: &str) -> Result<(), String>;

  /// Install the stdout capture hook for the next run.
  fn set_output_hook(&self, hook: OutputHook) -> Result<(), String>;

  /// Restore the default (discarding) hook.
  fn clear_output_hook(&self) -> Result<(), String>;
}

/// Runs snippets with the configured Python interpreter as a child process.
///
/// Source is fed over stdin (`python -I -`), stdout streams into the hook,
/// and a trailing slice of stderr becomes the fault message on nonzero exit.
/// Children are spawned kill-on-drop, so a run abandoned at the deadline is
/// actually cancelled rather than left running invisibly.
pub struct PythonSandbox {
  python_bin: String,
  hook: Mutex<Option<OutputHook>>,
}

impl PythonSandbox {
  pub fn new(python_bin: impl Into<String>) -> Self {
    Self { python_bin: python_bin.into(), hook: Mutex::new(None) }
  }
}

#[async_trait]
impl Sandbox for PythonSandbox {
  #[instrument(level = "debug", skip(self, source), fields(source_len = source.len()))]
  async fn execute(&self, source: &str) -> Result<(), String> {
    let hook = {
      self
        .hook
        .lock()
        .map_err(|_| "output hook lock poisoned".to_string())?
        .clone()
    };

    let mut child = Command::new(&self.python_bin)
      .arg("-I")
      .arg("-")
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| format!("failed to start interpreter '{}': {}", self.python_bin, e))?;

    let mut stdin = child.stdin.take().ok_or_else(|| "interpreter stdin unavailable".to_string())?;
    stdin
      .write_all(source.as_bytes())
      .await
      .map_err(|e| format!("failed to send source to interpreter: {}", e))?;
    drop(stdin);

    let stdout = child.stdout.take().ok_or_else(|| "interpreter stdout unavailable".to_string())?;
    let stderr = child.stderr.take().ok_or_else(|| "interpreter stderr unavailable".to_string())?;

    // Pump stdout into the hook while draining stderr, so neither pipe can
    // fill up and stall the child.
    let pump = async {
      let mut reader = BufReader::new(stdout);
      let mut line = String::new();
      loop {
        line.clear();
        match reader.read_line(&mut line).await {
          Ok(0) => break,
          Ok(_) => {
            if let Some(h) = &hook {
              h(&line);
            }
          }
          Err(e) => {
            debug!(target: "challenge", error = %e, "stdout pipe read failed");
            break;
          }
        }
      }
    };
    let drain = async {
      let mut text = String::new();
      let _ = BufReader::new(stderr).read_to_string(&mut text).await;
      text
    };
    let ((), err_text) = tokio::join!(pump, drain);

    let status = child.wait().await.map_err(|e| format!("failed to await interpreter: {}", e))?;
    if status.success() {
      Ok(())
    } else {
      let tail = stderr_tail(&err_text, 12);
      if tail.is_empty() {
        Err(format!("interpreter exited with {}", status))
      } else {
        Err(tail)
      }
    }
  }

  fn set_output_hook(&self, hook: OutputHook) -> Result<(), String> {
    let mut slot = self.hook.lock().map_err(|_| "output hook lock poisoned".to_string())?;
    *slot = Some(hook);
    Ok(())
  }

  fn clear_output_hook(&self) -> Result<(), String> {
    let mut slot = self.hook.lock().map_err(|_| "output hook lock poisoned".to_string())?;
    *slot = None;
    Ok(())
  }
}

/// Keep the last `max_lines` of stderr; Python puts the error type and
/// message at the end of a traceback.
fn stderr_tail(text: &str, max_lines: usize) -> String {
  let trimmed = text.trim();
  if trimmed.is_empty() {
    return String::new();
  }
  let lines: Vec<&str> = trimmed.lines().collect();
  let start = lines.len().saturating_sub(max_lines);
  lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stderr_tail_keeps_last_lines() {
    let text = (1..=20).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
    let tail = stderr_tail(&text, 12);
    assert!(tail.starts_with("line 9"));
    assert!(tail.ends_with("line 20"));
    assert_eq!(stderr_tail("  \n ", 12), "");
  }

  #[tokio::test]
  async fn hook_install_and_clear_round_trip() {
    let sb = PythonSandbox::new("python3");
    let hook: OutputHook = Arc::new(|_chunk| {});
    sb.set_output_hook(hook).expect("set");
    assert!(sb.hook.lock().unwrap().is_some());
    sb.clear_output_hook().expect("clear");
    assert!(sb.hook.lock().unwrap().is_none());
  }
}
