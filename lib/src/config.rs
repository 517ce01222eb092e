//! Defines the client configuration used to build the default request mechanism.
//! Configurations can be built in code with [`Config::builder`] or loaded from a JSON file.

use anyhow::Result;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::Duration;

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

#[derive(Serialize, Deserialize, Builder, Debug, Clone, PartialEq)]
#[builder(default)]
pub struct Config {
    // overall timeout for a single request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    // user agent sent with every request; reqwest's default when unset
    #[builder(setter(into, strip_option))]
    #[serde(default)]
    pub user_agent: Option<String>,
    // redirects followed before a request fails
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
            max_redirects: default_max_redirects(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Prints out the current Config in a clear and readable way for command line output.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Timeout: {}s", self.timeout_secs);
        match &self.user_agent {
            Some(agent) => println!("  User Agent: {}", agent),
            None => println!("  User Agent: (default)"),
        }
        println!("  Max Redirects: {}", self.max_redirects);
    }
}
