use std::env;
use std::path::PathBuf;

// Defaults
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATA_DIR: &str = "database";
const DEFAULT_STATIC_DIR: &str = "static";

pub const BIND_ENV: &str = "SHEETVIZ_BIND";
pub const DATA_DIR_ENV: &str = "SHEETVIZ_DATA_DIR";
pub const STATIC_DIR_ENV: &str = "SHEETVIZ_STATIC_DIR";

/// Server settings.
///
/// Resolved from defaults, then environment variables, then positional
/// command-line arguments (`[bind_addr] [data_dir]`).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    pub bind_addr: String,

    /// Directory holding the key-value store file
    pub data_dir: PathBuf,

    /// Directory served under `/static`
    pub static_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }
}

impl AppConfig {
    /// Build the configuration from the process environment and arguments.
    pub fn load() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::resolve(|key| env::var(key).ok(), &args)
    }

    /// Resolve with an explicit variable lookup and argument list
    /// (arguments exclude the program name).
    pub fn resolve<F>(lookup: F, args: &[String]) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.trim().is_empty()) {
            config.bind_addr = bind;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(STATIC_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            config.static_dir = PathBuf::from(dir);
        }

        if let Some(bind) = args.first() {
            config.bind_addr = bind.clone();
        }
        if let Some(dir) = args.get(1) {
            config.data_dir = PathBuf::from(dir);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_override_environment() {
        let lookup = |key: &str| match key {
            BIND_ENV => Some("0.0.0.0:8080".to_string()),
            DATA_DIR_ENV => Some("/var/lib/sheetviz".to_string()),
            _ => None,
        };

        let config = AppConfig::resolve(lookup, &[]);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/sheetviz"));
        assert_eq!(config.static_dir, PathBuf::from("static"));

        let args = vec!["127.0.0.1:9000".to_string()];
        let config = AppConfig::resolve(lookup, &args);
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/sheetviz"));
    }

    #[test]
    fn defaults_without_input() {
        assert_eq!(AppConfig::resolve(|_| None, &[]), AppConfig::default());
    }
}
