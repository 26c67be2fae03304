//! Per-class password gate with time-limited sessions.
//!
//! A successful login issues an opaque token bound to one class code.
//! Sessions expire 24 hours after issue (refreshable on activity) and an
//! unauthenticated token means "no submissions" everywhere downstream.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct SessionEntry {
  class_code: String,
  issued_at: Instant,
}

/// Result of a session status query.
#[derive(Clone, Debug)]
pub struct SessionStatus {
  pub authenticated: bool,
  pub class_code: Option<String>,
  pub remaining_secs: u64,
}

pub struct SessionGate {
  passwords: HashMap<String, String>,
  sessions: Mutex<HashMap<String, SessionEntry>>,
  ttl: Duration,
}

impl SessionGate {
  pub fn new(passwords: HashMap<String, String>, ttl: Duration) -> Self {
    Self { passwords, sessions: Mutex::new(HashMap::new()), ttl }
  }

  /// Check credentials and issue a session token.
  /// The rejection message does not reveal whether the class code exists.
  #[instrument(level = "info", skip(self, password))]
  pub fn login(&self, class_code: &str, password: &str) -> Result<String, String> {
    match self.passwords.get(class_code) {
      Some(expected) if expected == password => {
        let token = Uuid::new_v4().to_string();
        let entry = SessionEntry { class_code: class_code.to_string(), issued_at: Instant::now() };
        if let Ok(mut sessions) = self.sessions.lock() {
          // Sweep expired entries here; abandoned tokens are never queried
          // again, so this is where they get collected.
          sessions.retain(|_, e| e.issued_at.elapsed() < self.ttl);
          sessions.insert(token.clone(), entry);
        }
        info!(target: "flagdeck_backend", %class_code, "Login accepted");
        Ok(token)
      }
      _ => {
        warn!(target: "flagdeck_backend", %class_code, "Login rejected");
        Err("incorrect class code or password".to_string())
      }
    }
  }

  /// Class code for a live session; expired entries are pruned on sight.
  pub fn class_for(&self, token: &str) -> Option<String> {
    let mut sessions = self.sessions.lock().ok()?;
    let expired = match sessions.get(token) {
      Some(entry) => entry.issued_at.elapsed() >= self.ttl,
      None => return None,
    };
    if expired {
      sessions.remove(token);
      return None;
    }
    sessions.get(token).map(|e| e.class_code.clone())
  }

  pub fn is_authenticated(&self, token: &str) -> bool {
    self.class_for(token).is_some()
  }

  /// Refresh the issue timestamp on user activity. No-op for dead tokens.
  pub fn extend(&self, token: &str) -> bool {
    if self.class_for(token).is_none() {
      return false;
    }
    if let Ok(mut sessions) = self.sessions.lock() {
      if let Some(entry) = sessions.get_mut(token) {
        entry.issued_at = Instant::now();
        return true;
      }
    }
    false
  }

  /// Status for a token; an expired entry is pruned, same as `class_for`.
  pub fn status(&self, token: &str) -> SessionStatus {
    let dead = SessionStatus { authenticated: false, class_code: None, remaining_secs: 0 };
    let mut sessions = match self.sessions.lock() {
      Ok(s) => s,
      Err(_) => return dead,
    };
    let (remaining, class_code) = match sessions.get(token) {
      Some(entry) => {
        (self.ttl.saturating_sub(entry.issued_at.elapsed()), entry.class_code.clone())
      }
      None => return dead,
    };
    if remaining.is_zero() {
      sessions.remove(token);
      return dead;
    }
    SessionStatus {
      authenticated: true,
      class_code: Some(class_code),
      remaining_secs: remaining.as_secs(),
    }
  }

  /// Drop the session. Returns the class code so the caller can also clear
  /// that class's solved set, which is part of logout semantics.
  #[instrument(level = "info", skip(self, token))]
  pub fn logout(&self, token: &str) -> Option<String> {
    let mut sessions = self.sessions.lock().ok()?;
    let entry = sessions.remove(token)?;
    info!(target: "flagdeck_backend", class_code = %entry.class_code, "Logged out");
    Some(entry.class_code)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gate_with(class: &str, password: &str, ttl: Duration) -> SessionGate {
    let mut passwords = HashMap::new();
    passwords.insert(class.to_string(), password.to_string());
    SessionGate::new(passwords, ttl)
  }

  #[test]
  fn login_issues_token_bound_to_class() {
    let gate = gate_with("CMN322", "secret", SESSION_TTL);
    let token = gate.login("CMN322", "secret").expect("login");
    assert_eq!(gate.class_for(&token).as_deref(), Some("CMN322"));
    assert!(gate.is_authenticated(&token));
  }

  #[test]
  fn wrong_password_and_unknown_class_read_the_same() {
    let gate = gate_with("CMN322", "secret", SESSION_TTL);
    let a = gate.login("CMN322", "nope").unwrap_err();
    let b = gate.login("NET201", "secret").unwrap_err();
    assert_eq!(a, b);
  }

  #[test]
  fn expired_session_is_not_authenticated() {
    let gate = gate_with("CMN322", "secret", Duration::ZERO);
    let token = gate.login("CMN322", "secret").expect("login");
    assert!(!gate.is_authenticated(&token));
    assert!(gate.class_for(&token).is_none());
    let status = gate.status(&token);
    assert!(!status.authenticated);
    assert_eq!(status.remaining_secs, 0);
  }

  #[test]
  fn status_query_prunes_an_expired_entry() {
    let gate = gate_with("CMN322", "secret", Duration::ZERO);
    let token = gate.login("CMN322", "secret").expect("login");
    assert_eq!(gate.sessions.lock().unwrap().len(), 1);

    let status = gate.status(&token);
    assert!(!status.authenticated);
    assert!(gate.sessions.lock().unwrap().is_empty(), "expired entry must not linger");
  }

  #[test]
  fn login_sweeps_abandoned_expired_tokens() {
    let gate = gate_with("CMN322", "secret", Duration::ZERO);
    // Tokens that are never queried again.
    gate.login("CMN322", "secret").expect("login");
    gate.login("CMN322", "secret").expect("login");

    gate.login("CMN322", "secret").expect("login");
    // Only the freshly issued token survives the sweep.
    assert_eq!(gate.sessions.lock().unwrap().len(), 1);
  }

  #[test]
  fn logout_returns_class_and_kills_token() {
    let gate = gate_with("CMN322", "secret", SESSION_TTL);
    let token = gate.login("CMN322", "secret").expect("login");
    assert_eq!(gate.logout(&token).as_deref(), Some("CMN322"));
    assert!(!gate.is_authenticated(&token));
    assert!(gate.logout(&token).is_none());
  }

  #[test]
  fn extend_refreshes_live_sessions_only() {
    let gate = gate_with("CMN322", "secret", SESSION_TTL);
    let token = gate.login("CMN322", "secret").expect("login");
    assert!(gate.extend(&token));
    assert!(!gate.extend("not-a-token"));
  }
}
