//! Domain models used by the backend: challenge kinds/difficulties/sources and the challenge itself.

use serde::{Deserialize, Serialize};

/// Coarse difficulty tier; used only for filtering and display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }

  /// Parse a query-string value; `None` for anything unrecognized.
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Some(Difficulty::Easy),
      "medium" => Some(Difficulty::Medium),
      "hard" => Some(Difficulty::Hard),
      _ => None,
    }
  }
}

/// What kind of challenge is presented to the user?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
  /// Free-text question; `expected` is the accepted answer (loosely normalized).
  Theory,
  /// Short Python exercise; `expected` is the exact stdout (trim-only).
  Coding,
}

/// Where did we get the challenge from?
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeSource {
  LocalBank, // from user-provided TOML bank
  BuiltIn,   // built-in catalog entries
}

/// Core challenge structure held in the immutable catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Challenge {
  pub id: u32,
  pub difficulty: Difficulty,
  pub kind: ChallengeKind,
  pub source: ChallengeSource,

  pub title: String,
  pub description: String,
  pub problem: String,
  pub hint: String,

  /// Expected answer text (theory) or expected stdout (coding), selected by `kind`.
  pub expected: String,
  /// Opaque token; namespaced as `<class_code>{<flag_token>}` on success.
  pub flag_token: String,
}
