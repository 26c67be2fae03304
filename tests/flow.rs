//! End-to-end flow over the public library surface: login, catalog listing,
//! theory and coding submissions, flag revelation, progress, and logout.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use flagdeck_backend::catalog::{builtin_challenges, Catalog};
use flagdeck_backend::logic::{
  do_logout, get_hint, list_challenges, progress_snapshot, submit_code, submit_theory_answer,
};
use flagdeck_backend::orchestrator::RunOutcome;
use flagdeck_backend::progress::MemoryStore;
use flagdeck_backend::sandbox::{OutputHook, Sandbox};
use flagdeck_backend::state::AppState;

/// Interpreter stand-in that replays queued run results in order.
struct QueueSandbox {
  hook: Mutex<Option<OutputHook>>,
  runs: Mutex<VecDeque<Result<String, String>>>,
}

impl QueueSandbox {
  fn with_runs(runs: Vec<Result<String, String>>) -> Self {
    Self { hook: Mutex::new(None), runs: Mutex::new(runs.into_iter().collect()) }
  }
}

#[async_trait]
impl Sandbox for QueueSandbox {
  async fn execute(&self, _source: &str) -> Result<(), String> {
    let next = self.runs.lock().unwrap().pop_front().expect("unexpected sandbox run");
    match next {
      Ok(stdout) => {
        let hook = self.hook.lock().unwrap().clone();
        if let Some(h) = hook {
          h(&stdout);
        }
        Ok(())
      }
      Err(fault) => Err(fault),
    }
  }

  fn set_output_hook(&self, hook: OutputHook) -> Result<(), String> {
    *self.hook.lock().unwrap() = Some(hook);
    Ok(())
  }

  fn clear_output_hook(&self) -> Result<(), String> {
    *self.hook.lock().unwrap() = None;
    Ok(())
  }
}

fn test_state(runs: Vec<Result<String, String>>) -> AppState {
  let mut passwords = HashMap::new();
  passwords.insert("CMN322".to_string(), "cmn322_iot_2025".to_string());
  AppState::with_parts(
    Catalog::build(builtin_challenges()),
    Arc::new(QueueSandbox::with_runs(runs)),
    Arc::new(MemoryStore::new()),
    passwords,
    Duration::from_secs(24 * 60 * 60),
    Duration::from_secs(5),
  )
}

#[tokio::test]
async fn full_session_flow_solves_and_clears() {
  let state = test_state(vec![
    Ok("ALERT\n".into()),
    Ok("[25,22,28,29]\n".into()),
    Err("ZeroDivisionError: division by zero".into()),
  ]);

  // Wrong password first; then a real login.
  assert!(state.gate.login("CMN322", "wrong").is_err());
  let token = state.gate.login("CMN322", "cmn322_iot_2025").expect("login");

  // Catalog listing: nothing solved yet, no leaked fields.
  let listing = list_challenges(&state, &token, None).expect("listing");
  assert_eq!(listing.len(), state.catalog.len());
  assert!(listing.iter().all(|c| !c.solved));

  // Theory: case and punctuation variance is accepted.
  let verdict = submit_theory_answer(&state, &token, 20, "  Time-Series ").expect("submit");
  assert!(verdict.correct);
  assert_eq!(verdict.flag.as_deref(), Some("CMN322{temporal_data_storage}"));

  // Coding: expected "ALERT", sandbox prints "ALERT\n".
  let verdict = submit_code(&state, &token, 5, "print('ALERT')").await.expect("run");
  assert!(matches!(verdict.outcome, RunOutcome::Success { ref output } if output == "ALERT"));
  assert_eq!(verdict.flag.as_deref(), Some("CMN322{conditional_monitoring}"));

  // Coding: missing spaces in the list literal is a mismatch, not a solve.
  let verdict = submit_code(&state, &token, 12, "print(normal)").await.expect("run");
  assert!(
    matches!(verdict.outcome, RunOutcome::IncorrectOutput { ref output } if output == "[25,22,28,29]")
  );
  assert!(verdict.flag.is_none());

  // Coding: a fault surfaces its message verbatim.
  let verdict = submit_code(&state, &token, 12, "1/0").await.expect("run");
  assert!(
    matches!(verdict.outcome, RunOutcome::RuntimeError { ref message } if message.contains("ZeroDivisionError"))
  );

  // Empty input short-circuits without consuming a queued run.
  let verdict = submit_code(&state, &token, 12, "   ").await.expect("run");
  assert!(matches!(verdict.outcome, RunOutcome::EmptyInput));

  // Progress reflects the two solves; listing marks them.
  let (class_code, solved) = progress_snapshot(&state, &token).expect("progress");
  assert_eq!(class_code, "CMN322");
  assert_eq!(solved, vec![20, 5]);
  let listing = list_challenges(&state, &token, None).expect("listing");
  assert!(listing.iter().find(|c| c.id == 20).unwrap().solved);
  assert!(listing.iter().find(|c| c.id == 5).unwrap().solved);

  // Hints come only from the dedicated operation.
  let hint = get_hint(&state, &token, 5).expect("hint");
  assert!(hint.contains("if-else"));

  // Logout kills the session and clears the class's progress.
  do_logout(&state, &token).expect("logout");
  assert!(progress_snapshot(&state, &token).is_err());

  let token = state.gate.login("CMN322", "cmn322_iot_2025").expect("re-login");
  let (_, solved) = progress_snapshot(&state, &token).expect("progress");
  assert!(solved.is_empty());
}

#[tokio::test]
async fn resolving_a_challenge_twice_keeps_one_entry() {
  let state = test_state(vec![Ok("3\n".into()), Ok("3\n".into())]);
  let token = state.gate.login("CMN322", "cmn322_iot_2025").expect("login");

  for _ in 0..2 {
    let verdict = submit_code(&state, &token, 9, "print(devices.count('online'))")
      .await
      .expect("run");
    assert!(matches!(verdict.outcome, RunOutcome::Success { .. }));
  }
  let (_, solved) = progress_snapshot(&state, &token).expect("progress");
  assert_eq!(solved, vec![9]);
}
