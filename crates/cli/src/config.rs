//! CLI configuration read from the environment.
use std::env;
use std::path::PathBuf;

/// Replay tool configuration.
#[derive(Clone, Debug)]
pub struct CliConfig {
    /// Directory holding `items.ron`, `fluids.ron`, `machines/` and `scenarios/`.
    pub content_dir: PathBuf,
    /// Print every sync payload as hex.
    pub print_hex: bool,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("crates/cli/data"),
            print_hex: false,
            log_filter: "info".to_owned(),
        }
    }
}

impl CliConfig {
    /// Construct CLI configuration from environment variables.
    ///
    /// Environment variables:
    /// - `STORAGE_CONTENT_DIR` - Content directory (default: `crates/cli/data`)
    /// - `STORAGE_CLI_HEX` - Print sync payloads as hex (default: false)
    /// - `STORAGE_CLI_LOG` - Default log filter (default: `info`)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = env::var("STORAGE_CONTENT_DIR") {
            config.content_dir = PathBuf::from(dir);
        }
        if let Some(hex) = read_env::<bool>("STORAGE_CLI_HEX") {
            config.print_hex = hex;
        }
        if let Ok(filter) = env::var("STORAGE_CLI_LOG") {
            config.log_filter = filter;
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
