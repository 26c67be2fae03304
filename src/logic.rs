//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - The session check every operation starts with
//!   - Theory answer verification and flag revelation
//!   - Coding submissions through the execution orchestrator
//!   - Catalog listing, hints, progress snapshots, and logout

use tracing::{error, info, instrument};

use crate::domain::{Challenge, ChallengeKind, Difficulty};
use crate::orchestrator::{run_submission, RunOutcome};
use crate::protocol::{to_out, ChallengeOut};
use crate::state::AppState;
use crate::verify::verify;

/// Operation failures surfaced to clients. Everything here is recoverable
/// and local to one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiError {
  Unauthorized(String),
  NotFound(String),
  BadRequest(String),
}

impl ApiError {
  pub fn message(&self) -> &str {
    match self {
      ApiError::Unauthorized(m) | ApiError::NotFound(m) | ApiError::BadRequest(m) => m,
    }
  }

  fn unauthenticated() -> Self {
    ApiError::Unauthorized("not authenticated; log in with your class password".into())
  }
}

/// Verdict on a theory submission. The flag exists only on a match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerVerdict {
  pub correct: bool,
  pub flag: Option<String>,
}

/// Verdict on a coding submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeVerdict {
  pub outcome: RunOutcome,
  pub flag: Option<String>,
}

/// The namespaced flag, `<class_code>{<flag_token>}`. Only called after a
/// positive verification; the token never appears in catalog payloads.
pub fn reveal_flag(class_code: &str, challenge: &Challenge) -> String {
  format!("{}{{{}}}", class_code, challenge.flag_token)
}

fn authenticated_class(state: &AppState, token: &str) -> Result<String, ApiError> {
  state.gate.class_for(token).ok_or_else(ApiError::unauthenticated)
}

fn challenge_of_kind<'a>(
  state: &'a AppState,
  challenge_id: u32,
  kind: ChallengeKind,
) -> Result<&'a Challenge, ApiError> {
  let ch = state
    .catalog
    .get(challenge_id)
    .ok_or_else(|| ApiError::NotFound(format!("unknown challenge id: {}", challenge_id)))?;
  if ch.kind != kind {
    let want = match kind {
      ChallengeKind::Theory => "a theory challenge",
      ChallengeKind::Coding => "a coding challenge",
    };
    return Err(ApiError::BadRequest(format!("challenge {} is not {}", challenge_id, want)));
  }
  Ok(ch)
}

/// Record a solve. A store failure must not block the flag the user already
/// earned, so it is logged and swallowed.
fn record_solve(state: &AppState, class_code: &str, challenge_id: u32) {
  if let Err(e) = state.progress.mark_solved(class_code, challenge_id) {
    error!(target: "flagdeck_backend", %class_code, challenge_id, error = %e, "Failed to persist solve");
  }
}

#[instrument(level = "info", skip(state, token, answer), fields(answer_len = answer.len()))]
pub fn submit_theory_answer(
  state: &AppState,
  token: &str,
  challenge_id: u32,
  answer: &str,
) -> Result<AnswerVerdict, ApiError> {
  let class_code = authenticated_class(state, token)?;
  let ch = challenge_of_kind(state, challenge_id, ChallengeKind::Theory)?;

  if verify(ch, answer).matched {
    record_solve(state, &class_code, ch.id);
    info!(target: "challenge", id = ch.id, %class_code, "Theory answer accepted");
    Ok(AnswerVerdict { correct: true, flag: Some(reveal_flag(&class_code, ch)) })
  } else {
    Ok(AnswerVerdict { correct: false, flag: None })
  }
}

#[instrument(level = "info", skip(state, token, source), fields(source_len = source.len()))]
pub async fn submit_code(
  state: &AppState,
  token: &str,
  challenge_id: u32,
  source: &str,
) -> Result<CodeVerdict, ApiError> {
  let class_code = authenticated_class(state, token)?;
  let ch = challenge_of_kind(state, challenge_id, ChallengeKind::Coding)?;

  let outcome = run_submission(&state.sandbox, ch, source, state.deadline).await;
  let flag = match &outcome {
    RunOutcome::Success { .. } => {
      record_solve(state, &class_code, ch.id);
      info!(target: "challenge", id = ch.id, %class_code, "Coding submission accepted");
      Some(reveal_flag(&class_code, ch))
    }
    _ => None,
  };
  Ok(CodeVerdict { outcome, flag })
}

#[instrument(level = "info", skip(state, token))]
pub fn get_hint(state: &AppState, token: &str, challenge_id: u32) -> Result<String, ApiError> {
  authenticated_class(state, token)?;
  let ch = state
    .catalog
    .get(challenge_id)
    .ok_or_else(|| ApiError::NotFound(format!("unknown challenge id: {}", challenge_id)))?;
  Ok(ch.hint.clone())
}

/// Catalog listing with per-challenge solved markers, optionally filtered by
/// difficulty. Expected values and flag tokens never leave the server here.
#[instrument(level = "info", skip(state, token))]
pub fn list_challenges(
  state: &AppState,
  token: &str,
  difficulty: Option<Difficulty>,
) -> Result<Vec<ChallengeOut>, ApiError> {
  let class_code = authenticated_class(state, token)?;
  let solved = state.progress.solved_ids(&class_code);
  let challenges: Vec<&Challenge> = match difficulty {
    Some(d) => state.catalog.by_difficulty(d),
    None => state.catalog.iter().collect(),
  };
  Ok(challenges.into_iter().map(|c| to_out(c, solved.contains(&c.id))).collect())
}

#[instrument(level = "info", skip(state, token))]
pub fn progress_snapshot(state: &AppState, token: &str) -> Result<(String, Vec<u32>), ApiError> {
  let class_code = authenticated_class(state, token)?;
  let solved = state.progress.solved_ids(&class_code);
  Ok((class_code, solved))
}

/// End the session and clear the class's solved set, matching the original
/// logout semantics.
#[instrument(level = "info", skip(state, token))]
pub fn do_logout(state: &AppState, token: &str) -> Result<(), ApiError> {
  let class_code = state
    .gate
    .logout(token)
    .ok_or_else(ApiError::unauthenticated)?;
  if let Err(e) = state.progress.clear_all(&class_code) {
    error!(target: "flagdeck_backend", %class_code, error = %e, "Failed to clear progress on logout");
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::{builtin_challenges, Catalog};
  use crate::progress::MemoryStore;
  use crate::sandbox::{OutputHook, Sandbox};
  use async_trait::async_trait;
  use std::collections::HashMap;
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  /// Sandbox that replays a fixed stdout.
  struct ReplaySandbox {
    hook: Mutex<Option<OutputHook>>,
    output: String,
  }

  #[async_trait]
  impl Sandbox for ReplaySandbox {
    async fn execute(&self, _source: &str) -> Result<(), String> {
      let hook = self.hook.lock().unwrap().clone();
      if let Some(h) = hook {
        h(&self.output);
      }
      Ok(())
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

  fn state_with_output(output: &str) -> AppState {
    let mut passwords = HashMap::new();
    passwords.insert("CMN322".to_string(), "secret".to_string());
    AppState::with_parts(
      Catalog::build(builtin_challenges()),
      Arc::new(ReplaySandbox { hook: Mutex::new(None), output: output.into() }),
      Arc::new(MemoryStore::new()),
      passwords,
      Duration::from_secs(60 * 60),
      Duration::from_secs(5),
    )
  }

  fn login(state: &AppState) -> String {
    state.gate.login("CMN322", "secret").expect("login")
  }

  #[test]
  fn theory_match_reveals_namespaced_flag_and_records_solve() {
    let state = state_with_output("");
    let token = login(&state);
    // Challenge 6 expects "information"; punctuation and case are ignored.
    let verdict = submit_theory_answer(&state, &token, 6, "Information.").expect("verdict");
    assert!(verdict.correct);
    assert_eq!(verdict.flag.as_deref(), Some("CMN322{data_to_wisdom_path}"));
    assert!(state.progress.is_solved("CMN322", 6));
  }

  #[test]
  fn theory_mismatch_has_no_flag_and_no_solve() {
    let state = state_with_output("");
    let token = login(&state);
    let verdict = submit_theory_answer(&state, &token, 6, "wisdom").expect("verdict");
    assert!(!verdict.correct);
    assert!(verdict.flag.is_none());
    assert!(!state.progress.is_solved("CMN322", 6));
  }

  #[test]
  fn operations_require_a_live_session() {
    let state = state_with_output("");
    let err = submit_theory_answer(&state, "bogus-token", 6, "information").unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert!(matches!(list_challenges(&state, "bogus-token", None), Err(ApiError::Unauthorized(_))));
    assert!(matches!(get_hint(&state, "bogus-token", 6), Err(ApiError::Unauthorized(_))));
  }

  #[test]
  fn kind_mismatch_is_rejected() {
    let state = state_with_output("");
    let token = login(&state);
    // 5 is a coding challenge; a theory submission against it is malformed.
    let err = submit_theory_answer(&state, &token, 5, "ALERT").unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    let err = submit_theory_answer(&state, &token, 999, "x").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
  }

  #[tokio::test]
  async fn coding_success_reveals_flag() {
    let state = state_with_output("ALERT\n");
    let token = login(&state);
    let verdict = submit_code(&state, &token, 5, "print('ALERT')").await.expect("verdict");
    assert!(matches!(verdict.outcome, RunOutcome::Success { ref output } if output == "ALERT"));
    assert_eq!(verdict.flag.as_deref(), Some("CMN322{conditional_monitoring}"));
    assert!(state.progress.is_solved("CMN322", 5));
  }

  #[tokio::test]
  async fn coding_mismatch_keeps_flag_hidden() {
    let state = state_with_output("NORMAL\n");
    let token = login(&state);
    let verdict = submit_code(&state, &token, 5, "print('NORMAL')").await.expect("verdict");
    assert!(matches!(verdict.outcome, RunOutcome::IncorrectOutput { ref output } if output == "NORMAL"));
    assert!(verdict.flag.is_none());
    assert!(!state.progress.is_solved("CMN322", 5));
  }

  #[test]
  fn listing_marks_solved_and_filters_by_difficulty() {
    let state = state_with_output("");
    let token = login(&state);
    submit_theory_answer(&state, &token, 6, "information").unwrap();

    let all = list_challenges(&state, &token, None).unwrap();
    assert_eq!(all.len(), state.catalog.len());
    assert!(all.iter().find(|c| c.id == 6).unwrap().solved);
    assert!(!all.iter().find(|c| c.id == 5).unwrap().solved);

    let hard = list_challenges(&state, &token, Some(Difficulty::Hard)).unwrap();
    assert!(!hard.is_empty());
    assert!(hard.iter().all(|c| c.difficulty == Difficulty::Hard));
    assert_eq!(hard.len(), state.catalog.by_difficulty(Difficulty::Hard).len());
  }

  #[test]
  fn logout_clears_progress_and_session() {
    let state = state_with_output("");
    let token = login(&state);
    submit_theory_answer(&state, &token, 6, "information").unwrap();
    assert!(state.progress.is_solved("CMN322", 6));

    do_logout(&state, &token).expect("logout");
    assert!(!state.gate.is_authenticated(&token));
    assert!(state.progress.solved_ids("CMN322").is_empty());
  }
}
