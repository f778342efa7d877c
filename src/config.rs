use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine configuration, resolved once at startup.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub gcc_path: PathBuf,
    pub scratch_dir: PathBuf,
    pub compile_timeout: Duration,
    pub run_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gcc_path: PathBuf::from("/usr/bin/gcc"),
            scratch_dir: env::temp_dir().join("labgrader"),
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
            run_timeout: DEFAULT_RUN_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Reads overrides from the environment, keeping defaults for anything
    /// unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = env::var("GCC_PATH") {
            config.gcc_path = PathBuf::from(path);
        }
        if let Ok(dir) = env::var("LABGRADER_SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(dir);
        }
        if let Some(timeout) = env::var("LABGRADER_COMPILE_TIMEOUT_MS")
            .ok()
            .and_then(|raw| parse_ms(&raw))
        {
            config.compile_timeout = timeout;
        }
        if let Some(timeout) = env::var("LABGRADER_RUN_TIMEOUT_MS")
            .ok()
            .and_then(|raw| parse_ms(&raw))
        {
            config.run_timeout = timeout;
        }
        config
    }
}

fn parse_ms(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_policy() {
        let config = EngineConfig::default();
        assert_eq!(config.compile_timeout, Duration::from_secs(30));
        assert_eq!(config.run_timeout, Duration::from_secs(5));
        assert!(config.scratch_dir.ends_with("labgrader"));
    }

    #[test]
    fn parse_ms_accepts_plain_millis() {
        assert_eq!(parse_ms("2500"), Some(Duration::from_millis(2500)));
        assert_eq!(parse_ms(" 100 "), Some(Duration::from_millis(100)));
        assert_eq!(parse_ms("fast"), None);
        assert_eq!(parse_ms(""), None);
    }
}
