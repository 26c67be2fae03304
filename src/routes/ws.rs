//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::domain::Difficulty;
use crate::logic::*;
use crate::protocol::{run_out, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;
use crate::util::trunc_for_log;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "flagdeck_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "flagdeck_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => handle_client_ws(incoming, &state).await,
          Err(e) => {
            debug!(target: "flagdeck_backend", payload = %trunc_for_log(&txt, 256), "WS message not understood");
            ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }
          }
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "flagdeck_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "flagdeck_backend", "WebSocket disconnected");
}

fn err_msg(e: ApiError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.message().to_string() }
}

#[instrument(level = "info", skip(msg, state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Login { class_code, password } => match state.gate.login(&class_code, &password) {
      Ok(token) => {
        tracing::info!(target: "flagdeck_backend", %class_code, "WS login accepted");
        ServerWsMessage::LoggedIn { token, class_code }
      }
      Err(message) => ServerWsMessage::Error { message },
    },

    ClientWsMessage::Logout { token } => match do_logout(state, &token) {
      Ok(()) => ServerWsMessage::LoggedOut,
      Err(e) => err_msg(e),
    },

    ClientWsMessage::SessionStatus { token } => {
      let status = state.gate.status(&token);
      if status.authenticated {
        state.gate.extend(&token);
      }
      ServerWsMessage::Session {
        authenticated: status.authenticated,
        class_code: status.class_code,
        remaining_secs: status.remaining_secs,
      }
    }

    ClientWsMessage::ListChallenges { token, difficulty } => {
      let difficulty = match difficulty.as_deref() {
        None | Some("all") => None,
        Some(raw) => match Difficulty::parse(raw) {
          Some(d) => Some(d),
          None => {
            return ServerWsMessage::Error { message: format!("unknown difficulty: {}", raw) }
          }
        },
      };
      match list_challenges(state, &token, difficulty) {
        Ok(challenges) => {
          tracing::info!(target: "challenge", count = challenges.len(), "WS challenge list served");
          ServerWsMessage::Challenges { challenges }
        }
        Err(e) => err_msg(e),
      }
    }

    ClientWsMessage::SubmitAnswer { token, challenge_id, answer } => {
      match submit_theory_answer(state, &token, challenge_id, &answer) {
        Ok(verdict) => {
          tracing::info!(target: "challenge", id = challenge_id, correct = verdict.correct, "WS answer evaluated");
          ServerWsMessage::AnswerResult { correct: verdict.correct, flag: verdict.flag }
        }
        Err(e) => err_msg(e),
      }
    }

    ClientWsMessage::RunCode { token, challenge_id, source } => {
      let deadline_secs = state.deadline.as_secs();
      match submit_code(state, &token, challenge_id, &source).await {
        Ok(verdict) => {
          tracing::info!(target: "challenge", id = challenge_id, outcome = ?verdict.outcome, "WS run evaluated");
          ServerWsMessage::RunResult { result: run_out(verdict.outcome, verdict.flag, deadline_secs) }
        }
        Err(e) => err_msg(e),
      }
    }

    ClientWsMessage::Hint { token, challenge_id } => match get_hint(state, &token, challenge_id) {
      Ok(text) => {
        tracing::info!(target: "challenge", id = challenge_id, "WS hint served");
        ServerWsMessage::Hint { text }
      }
      Err(e) => err_msg(e),
    },

    ClientWsMessage::Progress { token } => match progress_snapshot(state, &token) {
      Ok((class_code, solved)) => ServerWsMessage::Progress { class_code, solved },
      Err(e) => err_msg(e),
    },
  }
}
