use std::env;

use tracing::warn;

pub const PROFILE_RELOAD_ENV_VAR: &str = "RESPACK_PROFILE_RELOAD";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadConfig {
    /// Time each reloader's phases and log a summary after a successful reload.
    pub profile_reloads: bool,
}

impl ReloadConfig {
    pub fn from_env() -> Self {
        let profile_reloads = match env::var(PROFILE_RELOAD_ENV_VAR) {
            Ok(value) => parse_flag(&value),
            Err(env::VarError::NotPresent) => false,
            Err(err) => {
                warn!(
                    env_var = PROFILE_RELOAD_ENV_VAR,
                    error = %err,
                    "unable to read profiling env var; profiling disabled"
                );
                false
            }
        };
        Self { profile_reloads }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
