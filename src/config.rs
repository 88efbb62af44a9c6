use std::net::SocketAddr;

use anyhow::Context;
use serde::Deserialize;

/// Process configuration read from the environment (`HOST`, `PORT`, ...).
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub debug: bool,
    /// Without it the service keeps everything in memory.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub entra_tenant_id: String,
    #[serde(default)]
    pub entra_client_id: String,
    #[serde(default)]
    pub entra_client_secret: String,
    #[serde(default)]
    pub entra_redirect_uri: String,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: default_host(),
            port: default_port(),
            debug: false,
            database_url: None,
            entra_tenant_id: String::new(),
            entra_client_id: String::new(),
            entra_client_secret: String::new(),
            entra_redirect_uri: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        envy::from_env::<Config>().context("invalid environment configuration")
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("`{}:{}` is not a socket address", self.host, self.port))
    }

    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}
