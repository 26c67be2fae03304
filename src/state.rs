//! Application state: catalog, sandbox, session gate, and progress tracker.
//!
//! This module owns construction from config/env: it merges the built-in
//! challenge bank with the optional TOML bank, wires the Python sandbox,
//! and picks the progress store (file-backed when configured, memory
//! otherwise).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::catalog::{builtin_challenges, Catalog};
use crate::config::{load_config_from_env, AppConfig};
use crate::domain::ChallengeSource;
use crate::orchestrator::SharedSandbox;
use crate::progress::{JsonFileStore, KvStore, MemoryStore, ProgressTracker};
use crate::sandbox::{PythonSandbox, Sandbox};
use crate::session::{SessionGate, SESSION_TTL};

// Demo class used when no config provides any. Keeps a fresh checkout usable.
const DEMO_CLASS_CODE: &str = "CMN322";
const DEMO_CLASS_PASSWORD: &str = "cmn322_iot_2025";

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub sandbox: Arc<SharedSandbox>,
    pub progress: ProgressTracker,
    pub gate: Arc<SessionGate>,
    pub deadline: Duration,
}

impl AppState {
    /// Build state from env: load config, merge challenge banks, init the
    /// sandbox and stores.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_config_from_env().unwrap_or_default();
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: AppConfig) -> Self {
        // Built-ins first so a config bank cannot shadow them (duplicate ids
        // are logged and skipped by the catalog).
        let mut bank = builtin_challenges();
        for cc in cfg.challenges {
            let id = cc.id;
            match cc.into_challenge() {
                Ok(ch) => bank.push(ch),
                Err(e) => error!(target: "challenge", id, error = %e, "Skipping bank item"),
            }
        }
        let catalog = Catalog::build(bank);

        // Inventory summary by difficulty/source.
        let mut count_by_diff: HashMap<&'static str, (usize, usize)> = HashMap::new();
        for ch in catalog.iter() {
            let entry = count_by_diff.entry(ch.difficulty.as_str()).or_insert((0, 0));
            match ch.source {
                ChallengeSource::LocalBank => entry.0 += 1,
                ChallengeSource::BuiltIn => entry.1 += 1,
            }
        }
        for (diff, (bank, builtin)) in count_by_diff {
            info!(target: "challenge", %diff, local_bank = bank, built_in = builtin, "Startup challenge inventory");
        }

        let mut passwords: HashMap<String, String> = cfg
            .classes
            .iter()
            .map(|c| (c.code.clone(), c.password.clone()))
            .collect();
        if passwords.is_empty() {
            warn!(target: "flagdeck_backend", class = DEMO_CLASS_CODE, "No classes configured; enabling the demo class");
            passwords.insert(DEMO_CLASS_CODE.to_string(), DEMO_CLASS_PASSWORD.to_string());
        }

        let store: Arc<dyn KvStore> = match &cfg.storage.progress_path {
            Some(path) => match JsonFileStore::open(PathBuf::from(path)) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!(target: "flagdeck_backend", %path, error = %e, "Progress file unusable; falling back to memory store");
                    Arc::new(MemoryStore::new())
                }
            },
            None => {
                info!(target: "flagdeck_backend", "No progress_path configured; progress is in-memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let sandbox: Arc<dyn Sandbox> = Arc::new(PythonSandbox::new(cfg.sandbox.python_bin.clone()));
        info!(
            target: "flagdeck_backend",
            python_bin = %cfg.sandbox.python_bin,
            deadline_secs = cfg.sandbox.deadline_secs,
            challenges = catalog.len(),
            "Sandbox configured"
        );

        Self {
            catalog: Arc::new(catalog),
            sandbox: Arc::new(SharedSandbox::new(sandbox)),
            progress: ProgressTracker::new(store),
            gate: Arc::new(SessionGate::new(passwords, SESSION_TTL)),
            deadline: Duration::from_secs(cfg.sandbox.deadline_secs),
        }
    }

    /// Fully injected constructor; used by tests to swap in a scripted
    /// sandbox and an ephemeral store.
    pub fn with_parts(
        catalog: Catalog,
        sandbox: Arc<dyn Sandbox>,
        store: Arc<dyn KvStore>,
        passwords: HashMap<String, String>,
        session_ttl: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            sandbox: Arc::new(SharedSandbox::new(sandbox)),
            progress: ProgressTracker::new(store),
            gate: Arc::new(SessionGate::new(passwords, session_ttl)),
            deadline,
        }
    }
}
