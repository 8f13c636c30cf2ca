use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub validator: ValidatorConfig,
}

#[derive(Deserialize, Debug)]
pub struct ValidatorConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "https://validator.w3.org/nu/?out=json".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; nucheck)".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from `path`, falling back to defaults if the file is absent
    pub fn load_or_default(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.validator.endpoint, "https://validator.w3.org/nu/?out=json");
        assert_eq!(config.validator.user_agent, "Mozilla/5.0 (compatible; nucheck)");
        assert_eq!(config.validator.timeout_secs, 30);
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            "[validator]\nendpoint = \"http://localhost:8888/nu/?out=json\"\ntimeout_secs = 5\n",
        )
        .unwrap();
        assert_eq!(config.validator.endpoint, "http://localhost:8888/nu/?out=json");
        assert_eq!(config.validator.timeout_secs, 5);
        // untouched fields keep their defaults
        assert_eq!(config.validator.user_agent, "Mozilla/5.0 (compatible; nucheck)");
    }
}
