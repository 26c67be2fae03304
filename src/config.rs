//! Loading service configuration (classes, sandbox, storage, optional
//! challenge bank) from TOML.
//!
//! See `AppConfig` for the expected schema. The path comes from the
//! `CTF_CONFIG_PATH` env variable; on any parsing/IO error we log and fall
//! back to defaults so the demo class and built-in bank still work.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{Challenge, ChallengeKind, ChallengeSource, Difficulty};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub classes: Vec<ClassCfg>,
  #[serde(default)]
  pub sandbox: SandboxCfg,
  #[serde(default)]
  pub storage: StorageCfg,
  #[serde(default)]
  pub challenges: Vec<ChallengeCfg>,
}

/// One class code with its access password. Server-side only; never sent to
/// clients.
#[derive(Clone, Debug, Deserialize)]
pub struct ClassCfg {
  pub code: String,
  pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SandboxCfg {
  #[serde(default = "default_python_bin")]
  pub python_bin: String,
  #[serde(default = "default_deadline_secs")]
  pub deadline_secs: u64,
}

impl Default for SandboxCfg {
  fn default() -> Self {
    Self { python_bin: default_python_bin(), deadline_secs: default_deadline_secs() }
  }
}

fn default_python_bin() -> String {
  "python3".into()
}

fn default_deadline_secs() -> u64 {
  5
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct StorageCfg {
  /// Path of the JSON progress file. Unset means in-memory only.
  #[serde(default)]
  pub progress_path: Option<String>,
}

/// Challenge entry accepted in TOML configuration.
/// Exactly one of `answer` (theory) / `expected_output` (coding) must be set,
/// matching `kind`.
#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeCfg {
  pub id: u32,
  pub difficulty: Difficulty,
  pub kind: ChallengeKind,
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub problem: String,
  #[serde(default)]
  pub hint: String,
  #[serde(default)]
  pub answer: Option<String>,
  #[serde(default)]
  pub expected_output: Option<String>,
  pub flag: String,
}

impl ChallengeCfg {
  /// Validate the kind/field pairing and produce a catalog challenge.
  pub fn into_challenge(self) -> Result<Challenge, String> {
    let expected = match (self.kind, self.answer, self.expected_output) {
      (ChallengeKind::Theory, Some(answer), None) => answer,
      (ChallengeKind::Coding, None, Some(output)) => output,
      (ChallengeKind::Theory, _, _) => {
        return Err("theory challenge needs 'answer' and must not set 'expected_output'".into())
      }
      (ChallengeKind::Coding, _, _) => {
        return Err("coding challenge needs 'expected_output' and must not set 'answer'".into())
      }
    };
    Ok(Challenge {
      id: self.id,
      difficulty: self.difficulty,
      kind: self.kind,
      source: ChallengeSource::LocalBank,
      title: self.title,
      description: self.description,
      problem: self.problem,
      hint: self.hint,
      expected,
      flag_token: self.flag,
    })
  }
}

/// Attempt to load `AppConfig` from CTF_CONFIG_PATH. On any parsing/IO error,
/// returns None.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("CTF_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "flagdeck_backend", %path, "Loaded service config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "flagdeck_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "flagdeck_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn challenge_cfg_enforces_kind_field_pairing() {
    let theory = ChallengeCfg {
      id: 50,
      difficulty: Difficulty::Easy,
      kind: ChallengeKind::Theory,
      title: "t".into(),
      description: String::new(),
      problem: "p".into(),
      hint: String::new(),
      answer: Some("closed".into()),
      expected_output: None,
      flag: "tok".into(),
    };
    let ch = theory.into_challenge().expect("valid theory entry");
    assert_eq!(ch.expected, "closed");
    assert_eq!(ch.source, ChallengeSource::LocalBank);

    let both = ChallengeCfg {
      id: 51,
      difficulty: Difficulty::Easy,
      kind: ChallengeKind::Coding,
      title: "t".into(),
      description: String::new(),
      problem: "p".into(),
      hint: String::new(),
      answer: Some("x".into()),
      expected_output: Some("y".into()),
      flag: "tok".into(),
    };
    assert!(both.into_challenge().is_err());
  }

  #[test]
  fn toml_bank_parses() {
    let cfg: AppConfig = toml::from_str(
      r#"
      [[classes]]
      code = "CMN322"
      password = "cmn322_iot_2025"

      [sandbox]
      deadline_secs = 5

      [[challenges]]
      id = 41
      difficulty = "easy"
      kind = "coding"
      title = "Echo"
      problem = "Print HELLO."
      expected_output = "HELLO"
      flag = "echo_flag"
      "#,
    )
    .expect("parse");
    assert_eq!(cfg.classes.len(), 1);
    assert_eq!(cfg.sandbox.deadline_secs, 5);
    assert_eq!(cfg.sandbox.python_bin, "python3");
    assert_eq!(cfg.challenges.len(), 1);
    assert!(cfg.challenges[0].clone().into_challenge().is_ok());
    assert!(cfg.storage.progress_path.is_none());
  }
}
