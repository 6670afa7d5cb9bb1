use std::path::{Path, PathBuf};

use tenantdex::{EngineConfig, Result, ServiceConfig, TenantdexError};

pub const DEFAULT_DATA_DIR: &str = "./indexes";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_BODY_MB: usize = 10;
pub const MIN_PRODUCTION_KEY_LEN: usize = 16;

const MB: usize = 1024 * 1024;
/// tantivy budgets its writer heap in decimal megabytes.
const WRITER_HEAP_MB: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvMode {
    Development,
    Production,
}

impl EnvMode {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("production") => EnvMode::Production,
            _ => EnvMode::Development,
        }
    }
}

/// Process configuration, read from `TENANTDEX_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub api_key: Option<String>,
    pub env_mode: EnvMode,
    pub max_hits: usize,
    pub writer_heap_mb: usize,
    pub max_body_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            api_key: None,
            env_mode: EnvMode::Development,
            max_hits: ServiceConfig::DEFAULT_MAX_HITS,
            writer_heap_mb: EngineConfig::DEFAULT_WRITER_HEAP_BYTES / WRITER_HEAP_MB,
            max_body_mb: DEFAULT_MAX_BODY_MB,
        }
    }
}

/// Load `.env` from the working directory or one of its parents.
/// Variables already present in the environment are left untouched.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenv::dotenv().ok()
}

/// Load a specific env file; same precedence as [`load_dotenv`].
pub fn load_env_file(path: &Path) -> Result<()> {
    dotenv::from_path(path).map_err(|e| {
        TenantdexError::Config(format!("failed to read {}: {}", path.display(), e))
    })
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = ServerConfig::default();

        let config = ServerConfig {
            data_dir: get("TENANTDEX_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            bind_addr: get("TENANTDEX_BIND_ADDR").unwrap_or(defaults.bind_addr),
            api_key: get("TENANTDEX_API_KEY"),
            env_mode: EnvMode::parse(get("TENANTDEX_ENV").as_deref()),
            max_hits: parse_number(&get, "TENANTDEX_MAX_HITS", defaults.max_hits, 1)?,
            writer_heap_mb: parse_number(
                &get,
                "TENANTDEX_WRITER_HEAP_MB",
                defaults.writer_heap_mb,
                EngineConfig::MIN_WRITER_HEAP_BYTES / WRITER_HEAP_MB,
            )?,
            max_body_mb: parse_number(&get, "TENANTDEX_MAX_BODY_MB", defaults.max_body_mb, 1)?,
        };
        megabytes(
            "TENANTDEX_WRITER_HEAP_MB",
            config.writer_heap_mb,
            WRITER_HEAP_MB,
        )?;
        megabytes("TENANTDEX_MAX_BODY_MB", config.max_body_mb, MB)?;
        Ok(config)
    }

    /// Startup guard: production requires a strong API key.
    pub fn check_auth(&self) -> Result<()> {
        if self.env_mode != EnvMode::Production {
            return Ok(());
        }
        match &self.api_key {
            None => Err(TenantdexError::Config(
                "TENANTDEX_API_KEY is required in production mode".to_string(),
            )),
            Some(key) if key.len() < MIN_PRODUCTION_KEY_LEN => Err(TenantdexError::Config(
                format!(
                    "TENANTDEX_API_KEY must be at least {} characters in production",
                    MIN_PRODUCTION_KEY_LEN
                ),
            )),
            Some(_) => Ok(()),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            writer_heap_bytes: self.writer_heap_mb.saturating_mul(WRITER_HEAP_MB),
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_hits: self.max_hits,
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb.saturating_mul(MB)
    }
}

fn megabytes(name: &str, value: usize, unit: usize) -> Result<usize> {
    value.checked_mul(unit).ok_or_else(|| {
        TenantdexError::Config(format!("{} is too large, got {}", name, value))
    })
}

fn parse_number<G>(get: &G, name: &str, default: usize, min: usize) -> Result<usize>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(name) else {
        return Ok(default);
    };
    let value: usize = raw.trim().parse().map_err(|_| {
        TenantdexError::Config(format!("{} must be a positive integer, got '{}'", name, raw))
    })?;
    if value < min {
        return Err(TenantdexError::Config(format!(
            "{} must be at least {}, got {}",
            name, min, value
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./indexes"));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.api_key, None);
        assert_eq!(config.env_mode, EnvMode::Development);
        assert_eq!(config.max_hits, 10);
        assert_eq!(config.engine_config().writer_heap_bytes, 20_000_000);
        assert_eq!(config.max_body_bytes(), 10 * 1024 * 1024);
        assert!(config.check_auth().is_ok());
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("TENANTDEX_DATA_DIR", "/var/lib/tenantdex"),
            ("TENANTDEX_BIND_ADDR", "0.0.0.0:9000"),
            ("TENANTDEX_API_KEY", "secret"),
            ("TENANTDEX_MAX_HITS", "50"),
            ("TENANTDEX_WRITER_HEAP_MB", "64"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/tenantdex"));
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.service_config().max_hits, 50);
        assert_eq!(config.engine_config().writer_heap_bytes, 64_000_000);
    }

    #[test]
    fn empty_api_key_counts_as_unset() {
        let config = ServerConfig::from_lookup(lookup(&[("TENANTDEX_API_KEY", "")])).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn rejects_bad_numbers() {
        for (name, value) in [
            ("TENANTDEX_MAX_HITS", "many"),
            ("TENANTDEX_MAX_HITS", "0"),
            ("TENANTDEX_WRITER_HEAP_MB", "4"),
            ("TENANTDEX_MAX_BODY_MB", "-1"),
        ] {
            let err = ServerConfig::from_lookup(lookup(&[(name, value)])).unwrap_err();
            assert!(matches!(err, TenantdexError::Config(_)), "{name}={value}");
            assert!(err.to_string().contains(name));
        }
    }

    #[test]
    fn rejects_sizes_that_overflow_bytes() {
        let huge = usize::MAX.to_string();
        for name in ["TENANTDEX_WRITER_HEAP_MB", "TENANTDEX_MAX_BODY_MB"] {
            let err = ServerConfig::from_lookup(lookup(&[(name, huge.as_str())])).unwrap_err();
            assert!(matches!(err, TenantdexError::Config(_)), "{name}");
            assert!(err.to_string().contains("too large"), "{err}");
        }
    }

    #[test]
    fn production_requires_strong_key() {
        let missing =
            ServerConfig::from_lookup(lookup(&[("TENANTDEX_ENV", "production")])).unwrap();
        assert!(missing
            .check_auth()
            .unwrap_err()
            .to_string()
            .contains("required in production mode"));

        let short = ServerConfig::from_lookup(lookup(&[
            ("TENANTDEX_ENV", "production"),
            ("TENANTDEX_API_KEY", "tooshort"),
        ]))
        .unwrap();
        assert!(short
            .check_auth()
            .unwrap_err()
            .to_string()
            .contains("at least 16 characters"));

        let ok = ServerConfig::from_lookup(lookup(&[
            ("TENANTDEX_ENV", "production"),
            ("TENANTDEX_API_KEY", "abcdef0123456789"),
        ]))
        .unwrap();
        assert!(ok.check_auth().is_ok());
    }

    #[test]
    #[serial]
    fn from_env_reads_process_environment() {
        std::env::set_var("TENANTDEX_BIND_ADDR", "127.0.0.1:18080");
        std::env::set_var("TENANTDEX_MAX_HITS", "25");
        let config = ServerConfig::from_env();
        std::env::remove_var("TENANTDEX_BIND_ADDR");
        std::env::remove_var("TENANTDEX_MAX_HITS");

        let config = config.unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:18080");
        assert_eq!(config.max_hits, 25);
    }

    #[test]
    #[serial]
    fn env_file_supplies_missing_variables() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join(".env");
        std::fs::write(
            &file,
            "TENANTDEX_API_KEY=from-dotenv-file-0123\nTENANTDEX_MAX_HITS=7\n",
        )
        .unwrap();
        std::env::set_var("TENANTDEX_MAX_HITS", "30");

        let loaded = load_env_file(&file);
        let config = ServerConfig::from_env();
        std::env::remove_var("TENANTDEX_API_KEY");
        std::env::remove_var("TENANTDEX_MAX_HITS");

        loaded.unwrap();
        let config = config.unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from-dotenv-file-0123"));
        assert_eq!(config.max_hits, 30);
    }

    #[test]
    fn missing_env_file_is_a_config_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = load_env_file(&tmp.path().join("absent.env")).unwrap_err();
        assert!(matches!(err, TenantdexError::Config(_)));
    }
}
