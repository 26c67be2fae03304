//! Answer verification: normalization policies and the pure comparison.
//!
//! Theory answers tolerate case, spacing, and punctuation differences so
//! "Time-Series" matches "time-series". Coding output is compared byte-exact
//! after trimming only, so numeric and collection formatting must match.

use crate::domain::{Challenge, ChallengeKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyResult {
  pub matched: bool,
}

/// Lowercase and keep only letters, digits, and underscore.
/// Collapses punctuation/whitespace differences for theory answers.
pub fn normalize_theory(s: &str) -> String {
  s.chars()
    .flat_map(char::to_lowercase)
    .filter(|c| c.is_alphanumeric() || *c == '_')
    .collect()
}

/// Compare a raw submission (typed answer or captured stdout) against the
/// challenge's expected value. Pure; the caller records progress on a match.
pub fn verify(challenge: &Challenge, raw_input: &str) -> VerifyResult {
  let matched = match challenge.kind {
    ChallengeKind::Theory => normalize_theory(raw_input) == normalize_theory(&challenge.expected),
    ChallengeKind::Coding => raw_input.trim() == challenge.expected.trim(),
  };
  VerifyResult { matched }
}
