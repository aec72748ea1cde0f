pub mod check;
pub mod fmt;
pub mod render;
pub mod tokens;

use anyhow::{Context as _, Result};
use clap::ArgMatches;
use cvscript_core::Config;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "cvscript.toml";

/// Configuration plus the directory its relative paths are taken from
pub struct LoadedConfig {
    pub config: Config,
    pub base_dir: PathBuf,
}

impl LoadedConfig {
    /// Content directory with relative paths resolved against the base
    pub fn content_dir(&self) -> PathBuf {
        self.base_dir.join(&self.config.content.dir)
    }
}

/// Load `--config`, else `./cvscript.toml` when present, else defaults.
/// Environment overrides apply last.
pub fn load_config(matches: &ArgMatches) -> Result<LoadedConfig> {
    let explicit = matches
        .try_get_one::<String>("config")
        .ok()
        .flatten()
        .map(PathBuf::from);
    let path = explicit.or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.is_file().then_some(default)
    });

    let (mut config, base_dir) = match path {
        Some(path) => {
            let config = Config::from_file(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            let base_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            (config, base_dir)
        }
        None => (Config::default(), PathBuf::new()),
    };

    config
        .apply_env()
        .context("Invalid CVSCRIPT_* environment override")?;
    config.validate().context("Invalid configuration")?;

    Ok(LoadedConfig { config, base_dir })
}

/// Install the stderr subscriber. `RUST_LOG` directives apply alongside the
/// configured level.
pub fn init_logging(level: &str) {
    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Read the `script` argument
pub fn read_script(matches: &ArgMatches) -> Result<(PathBuf, String)> {
    let path = matches
        .get_one::<String>("script")
        .map(PathBuf::from)
        .context("No script given")?;
    let source = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    Ok((path, source))
}
