//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Query, State}, response::IntoResponse, Json};
use tracing::{info, instrument};

use crate::domain::Difficulty;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(class_code = %body.class_code))]
pub async fn http_post_login(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LoginIn>,
) -> Result<Json<LoginOut>, ApiError> {
  let token = state
    .gate
    .login(&body.class_code, &body.password)
    .map_err(ApiError::Unauthorized)?;
  info!(target: "flagdeck_backend", class_code = %body.class_code, "HTTP login accepted");
  Ok(Json(LoginOut { token, class_code: body.class_code }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_logout(
  State(state): State<Arc<AppState>>,
  Json(body): Json<TokenIn>,
) -> Result<Json<HealthOut>, ApiError> {
  do_logout(&state, &body.token)?;
  Ok(Json(HealthOut { ok: true }))
}

#[instrument(level = "info", skip(state, q))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionQuery>,
) -> impl IntoResponse {
  let status = state.gate.status(&q.token);
  // Status queries count as activity for live sessions.
  if status.authenticated {
    state.gate.extend(&q.token);
  }
  Json(SessionOut {
    authenticated: status.authenticated,
    class_code: status.class_code,
    remaining_secs: status.remaining_secs,
  })
}

#[instrument(level = "info", skip(state, q), fields(difficulty = q.difficulty.as_deref().unwrap_or("all")))]
pub async fn http_get_challenges(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ChallengesQuery>,
) -> Result<Json<Vec<ChallengeOut>>, ApiError> {
  let difficulty = match q.difficulty.as_deref() {
    None | Some("all") => None,
    Some(raw) => Some(
      Difficulty::parse(raw)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown difficulty: {}", raw)))?,
    ),
  };
  let challenges = list_challenges(&state, &q.token, difficulty)?;
  info!(target: "challenge", count = challenges.len(), "HTTP challenge list served");
  Ok(Json(challenges))
}

#[instrument(level = "info", skip(state, body), fields(challenge_id = body.challenge_id, answer_len = body.answer.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<AnswerOut>, ApiError> {
  let verdict = submit_theory_answer(&state, &body.token, body.challenge_id, &body.answer)?;
  info!(target: "challenge", id = body.challenge_id, correct = verdict.correct, "HTTP answer evaluated");
  Ok(Json(AnswerOut { correct: verdict.correct, flag: verdict.flag }))
}

#[instrument(level = "info", skip(state, body), fields(challenge_id = body.challenge_id, source_len = body.source.len()))]
pub async fn http_post_run(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RunIn>,
) -> Result<Json<RunOut>, ApiError> {
  let deadline_secs = state.deadline.as_secs();
  let verdict = submit_code(&state, &body.token, body.challenge_id, &body.source).await?;
  info!(target: "challenge", id = body.challenge_id, outcome = ?verdict.outcome, "HTTP run evaluated");
  Ok(Json(run_out(verdict.outcome, verdict.flag, deadline_secs)))
}

#[instrument(level = "info", skip(state, q), fields(challenge_id = q.challenge_id))]
pub async fn http_get_hint(
  State(state): State<Arc<AppState>>,
  Query(q): Query<HintQuery>,
) -> Result<Json<HintOut>, ApiError> {
  let text = get_hint(&state, &q.token, q.challenge_id)?;
  info!(target: "challenge", id = q.challenge_id, "HTTP hint served");
  Ok(Json(HintOut { text }))
}

#[instrument(level = "info", skip(state, q))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ProgressQuery>,
) -> Result<Json<ProgressOut>, ApiError> {
  let (class_code, solved) = progress_snapshot(&state, &q.token)?;
  Ok(Json(ProgressOut { class_code, solved }))
}
