use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub timeout: u64,
    pub retries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            user_agent: format!("msvid-dl/{}", env!("CARGO_PKG_VERSION")),
            timeout: 30,
            retries: 3,
        }
    }
}

impl Config {
    /// Loads a TOML config file when one is given; missing keys fall back to
    /// defaults. No path means all defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "output_dir = \"/tmp/videos\"\nretries = 5").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/videos"));
        assert_eq!(config.retries, 5);
        assert!(config.user_agent.starts_with("msvid-dl/"));
    }

    #[test]
    fn no_path_means_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.timeout, 30);
    }
}
