//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use super::issue::ConfigIssue;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

const PROJECT_FILES: [&str; 2] = ["autopilot.toml", ".autopilot.toml"];
const ENV_PREFIX: &str = "AUTOPILOT_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Config file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Invalid configuration:\n{}", render_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn render_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Values given as CLI flags; they win over every file and the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub provider: Option<String>,
    pub max_parallel: Option<usize>,
    pub council_interval: Option<u64>,
    pub max_retries: Option<u32>,
    pub stall_timeout_secs: Option<u64>,
    pub state_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut FileConfig) {
        if let Some(provider) = &self.provider {
            config.provider.name = provider.clone();
        }
        if let Some(n) = self.max_parallel {
            config.provider.max_parallel = n;
        }
        if let Some(interval) = self.council_interval {
            config.council.interval = interval;
        }
        if let Some(max) = self.max_retries {
            config.retry.max_retries = max;
        }
        if let Some(secs) = self.stall_timeout_secs {
            config.queue.stall_timeout_secs = secs;
        }
        if let Some(dir) = &self.state_dir {
            config.session.state_dir = dir.clone();
        }
    }
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Environment (`AUTOPILOT_SECTION__KEY`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./autopilot.toml` or `./.autopilot.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/autopilot/config.toml`
    /// 5. Default values
    ///
    /// CLI flags are applied on top by the caller through [`ConfigOverrides`].
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        if let Some(path) = config_path
            && !path.exists()
        {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        Self::figment(
            Self::global_config_path().filter(|p| p.exists()),
            Self::project_config_path(),
            config_path,
        )
        .extract()
        .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    fn figment(global: Option<PathBuf>, project: Option<PathBuf>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));
        if let Some(path) = global {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = project {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Split validation results: errors abort, warnings are returned.
    pub fn check(config: &FileConfig) -> Result<Vec<ConfigIssue>, ConfigError> {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            config.validate().into_iter().partition(|i| i.is_error());
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("autopilot").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(config_path: Option<&Path>) {
        println!("Configuration sources (in priority order):");
        println!("  [     ] CLI flags");

        let env: Vec<String> = std::env::vars()
            .map(|(k, _)| k)
            .filter(|k| k.starts_with(ENV_PREFIX))
            .collect();
        if env.is_empty() {
            println!("  [     ] Env:     {}*", ENV_PREFIX);
        } else {
            println!("  [FOUND] Env:     {}", env.join(", "));
        }

        if let Some(path) = config_path {
            let mark = if path.exists() { "FOUND" } else { "MISSING" };
            println!("  [{:<5}] Explicit: {}", mark, path.display());
        }

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./autopilot.toml or ./.autopilot.toml");
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                println!("  [FOUND] Global:  {}", path.display());
            } else {
                println!("  [     ] Global:  {}", path.display());
            }
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path().unwrap();
        assert!(path.to_string_lossy().contains("autopilot"));
    }

    #[test]
    fn test_explicit_file_wins_over_project() {
        let dir = tempfile::tempdir().unwrap();
        let project = write(
            dir.path(),
            "autopilot.toml",
            "[retry]\nmax_retries = 2\n[council]\nsize = 5\n",
        );
        let explicit = write(dir.path(), "custom.toml", "[retry]\nmax_retries = 9\n");

        let config: FileConfig = ConfigLoader::figment(None, Some(project), Some(&explicit))
            .extract()
            .unwrap();
        assert_eq!(config.retry.max_retries, 9);
        assert_eq!(config.council.size, 5);
        assert_eq!(config.queue.stall_timeout_secs, 1800);
    }

    #[test]
    fn test_malformed_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write(dir.path(), "bad.toml", "[retry]\nmax_retries = \"many\"\n");
        let result: Result<FileConfig, _> =
            ConfigLoader::figment(None, None, Some(&explicit)).extract();
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = FileConfig::default();
        ConfigOverrides {
            provider: Some("codex".into()),
            max_retries: Some(1),
            state_dir: Some(PathBuf::from("/tmp/state")),
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(config.provider.name, "codex");
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.session.state_dir, PathBuf::from("/tmp/state"));
        assert_eq!(config.provider.max_parallel, 4);
    }

    #[test]
    fn test_check_splits_errors_from_warnings() {
        let mut config = FileConfig::default();
        config.retry.backoff = "linear".into();
        assert_eq!(ConfigLoader::check(&config).unwrap().len(), 1);

        config.provider.max_parallel = 0;
        assert!(matches!(
            ConfigLoader::check(&config),
            Err(ConfigError::Invalid(errors)) if errors.len() == 1
        ));
    }
}
