use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "CareIntake";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory
/// ~/CareIntake/ on all platforms, the working directory when no home is known
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the interview record database
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("intake.db")
}

/// Log filter used when `RUST_LOG` is not set
pub fn default_log_filter() -> &'static str {
    "info,careintake=debug"
}

// ═══════════════════════════════════════════════════════════
// Runtime configuration
// ═══════════════════════════════════════════════════════════

/// Tunables for the interview engine and its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeConfig {
    /// Fully detailed symptoms needed before the interview closes.
    pub min_detailed_symptoms: usize,
    /// Turns kept in each engine's rolling history.
    pub history_window: usize,
    pub oracle_timeout: Duration,
    pub session_idle_timeout: Duration,
    pub max_sessions: usize,
    pub ollama_url: String,
    pub model: String,
    pub db_path: PathBuf,
    pub listen_addr: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            min_detailed_symptoms: 4,
            history_window: 10,
            oracle_timeout: Duration::from_secs(60),
            session_idle_timeout: Duration::from_secs(30 * 60),
            max_sessions: 10_000,
            ollama_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            db_path: default_db_path(),
            listen_addr: "127.0.0.1:8088".to_string(),
        }
    }
}

impl IntakeConfig {
    /// Defaults overridden by `INTAKE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values are logged and
    /// the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = parse_var::<usize>(&lookup, "INTAKE_MIN_DETAILED_SYMPTOMS") {
            if v > 0 {
                config.min_detailed_symptoms = v;
            } else {
                tracing::warn!(key = "INTAKE_MIN_DETAILED_SYMPTOMS", "Must be at least 1, keeping default");
            }
        }
        if let Some(v) = parse_var::<usize>(&lookup, "INTAKE_HISTORY_WINDOW") {
            config.history_window = v;
        }
        if let Some(v) = parse_var::<u64>(&lookup, "INTAKE_ORACLE_TIMEOUT_SECS") {
            config.oracle_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<u64>(&lookup, "INTAKE_SESSION_IDLE_SECS") {
            config.session_idle_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<usize>(&lookup, "INTAKE_MAX_SESSIONS") {
            config.max_sessions = v.max(1);
        }
        if let Some(v) = non_empty(&lookup, "INTAKE_OLLAMA_URL") {
            config.ollama_url = v;
        }
        if let Some(v) = non_empty(&lookup, "INTAKE_MODEL") {
            config.model = v;
        }
        if let Some(v) = non_empty(&lookup, "INTAKE_DB_PATH") {
            config.db_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty(&lookup, "INTAKE_LISTEN_ADDR") {
            config.listen_addr = v;
        }

        config
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = non_empty(lookup, key)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid configuration value, keeping default");
            None
        }
    }
}
