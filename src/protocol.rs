//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! Challenge payloads never include expected answers, expected output, or
//! flag tokens; flags appear only in positive submission results.

use serde::{Deserialize, Serialize};

use crate::domain::{Challenge, ChallengeKind, ChallengeSource, Difficulty};
use crate::orchestrator::RunOutcome;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Login {
        #[serde(rename = "classCode")]
        class_code: String,
        password: String,
    },
    Logout {
        token: String,
    },
    SessionStatus {
        token: String,
    },
    ListChallenges {
        token: String,
        difficulty: Option<String>,
    },
    SubmitAnswer {
        token: String,
        #[serde(rename = "challengeId")]
        challenge_id: u32,
        answer: String,
    },
    RunCode {
        token: String,
        #[serde(rename = "challengeId")]
        challenge_id: u32,
        source: String,
    },
    Hint {
        token: String,
        #[serde(rename = "challengeId")]
        challenge_id: u32,
    },
    Progress {
        token: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    LoggedIn {
        token: String,
        #[serde(rename = "classCode")]
        class_code: String,
    },
    LoggedOut,
    Session {
        authenticated: bool,
        #[serde(rename = "classCode")]
        class_code: Option<String>,
        remaining_secs: u64,
    },
    Challenges {
        challenges: Vec<ChallengeOut>,
    },
    AnswerResult {
        correct: bool,
        flag: Option<String>,
    },
    RunResult {
        result: RunOut,
    },
    Hint {
        text: String,
    },
    Progress {
        #[serde(rename = "classCode")]
        class_code: String,
        solved: Vec<u32>,
    },
    Error {
        message: String,
    },
}

/// DTO used by both WS and HTTP for challenge delivery.
#[derive(Debug, Serialize)]
pub struct ChallengeOut {
    pub id: u32,
    pub difficulty: Difficulty,
    pub kind: ChallengeKind,
    pub source: ChallengeSource,

    pub title: String,
    pub description: String,
    pub problem: String,
    pub solved: bool,
}

/// Convert full `Challenge` (internal) to the public DTO. Hints go through
/// the dedicated hint operation only.
pub fn to_out(c: &Challenge, solved: bool) -> ChallengeOut {
    ChallengeOut {
        id: c.id,
        difficulty: c.difficulty,
        kind: c.kind,
        source: c.source.clone(),

        title: c.title.clone(),
        description: c.description.clone(),
        problem: c.problem.clone(),
        solved,
    }
}

/// Wire form of a coding run outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatusOut {
    Success,
    IncorrectOutput,
    EmptyInput,
    Timeout,
    RuntimeError,
}

#[derive(Debug, Serialize)]
pub struct RunOut {
    pub status: RunStatusOut,
    /// Actual captured output, for display. Empty for non-run outcomes.
    pub output: String,
    /// Human-readable note (timeout text, fault message, empty-input text).
    pub message: String,
    pub flag: Option<String>,
}

/// Map an orchestrator outcome (plus the earned flag, if any) into the wire
/// form. The expected output is deliberately absent from every branch.
pub fn run_out(outcome: RunOutcome, flag: Option<String>, deadline_secs: u64) -> RunOut {
    match outcome {
        RunOutcome::Success { output } => RunOut {
            status: RunStatusOut::Success,
            output,
            message: String::new(),
            flag,
        },
        RunOutcome::IncorrectOutput { output } => RunOut {
            status: RunStatusOut::IncorrectOutput,
            output,
            message: "Incorrect output. Check for exact match, including floats and lists.".into(),
            flag: None,
        },
        RunOutcome::EmptyInput => RunOut {
            status: RunStatusOut::EmptyInput,
            output: String::new(),
            message: "Please write some code first.".into(),
            flag: None,
        },
        RunOutcome::Timeout => RunOut {
            status: RunStatusOut::Timeout,
            output: String::new(),
            message: format!("Execution timeout: code took longer than {} seconds.", deadline_secs),
            flag: None,
        },
        RunOutcome::RuntimeError { message } => RunOut {
            status: RunStatusOut::RuntimeError,
            output: String::new(),
            message,
            flag: None,
        },
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct LoginIn {
    #[serde(rename = "classCode")]
    pub class_code: String,
    pub password: String,
}
#[derive(Serialize)]
pub struct LoginOut {
    pub token: String,
    #[serde(rename = "classCode")]
    pub class_code: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenIn {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub token: String,
}
#[derive(Serialize)]
pub struct SessionOut {
    pub authenticated: bool,
    #[serde(rename = "classCode")]
    pub class_code: Option<String>,
    pub remaining_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChallengesQuery {
    pub token: String,
    pub difficulty: Option<String>,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    pub token: String,
    #[serde(rename = "challengeId")]
    pub challenge_id: u32,
    pub answer: String,
}
#[derive(Serialize)]
pub struct AnswerOut {
    pub correct: bool,
    pub flag: Option<String>,
}

#[derive(Deserialize)]
pub struct RunIn {
    pub token: String,
    #[serde(rename = "challengeId")]
    pub challenge_id: u32,
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct HintQuery {
    pub token: String,
    #[serde(rename = "challengeId")]
    pub challenge_id: u32,
}
#[derive(Serialize)]
pub struct HintOut {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub token: String,
}
#[derive(Serialize)]
pub struct ProgressOut {
    #[serde(rename = "classCode")]
    pub class_code: String,
    pub solved: Vec<u32>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_challenges;

    #[test]
    fn challenge_dto_never_carries_answers_or_flags() {
        for ch in builtin_challenges() {
            let json = serde_json::to_string(&to_out(&ch, false)).expect("encode");
            assert!(!json.contains(&ch.flag_token), "flag token leaked for id {}", ch.id);
            assert!(!json.contains("\"expected\""), "expected field leaked for id {}", ch.id);
            assert!(!json.contains("\"flag_token\""), "flag field leaked for id {}", ch.id);
            assert!(!json.contains("\"hint\""), "hint field leaked for id {}", ch.id);
        }
    }

    #[test]
    fn run_out_hides_expected_and_carries_actual() {
        let out = run_out(
            RunOutcome::IncorrectOutput { output: "[25,22,28,29]".into() },
            None,
            5,
        );
        assert!(matches!(out.status, RunStatusOut::IncorrectOutput));
        assert_eq!(out.output, "[25,22,28,29]");
        assert!(out.flag.is_none());

        let out = run_out(RunOutcome::Timeout, None, 5);
        assert!(out.message.contains("5 seconds"));
    }
}
