// CLI module for precache
// Author: kelexine (https://github.com/kelexine)

use crate::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

/// precache - cache-first static asset server
#[derive(Parser, Debug)]
#[command(name = "precache", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.precache/config.toml)
    #[arg(short, long, env = "PRECACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind, overriding the config file
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, overriding the config file
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Populate the bucket and exit without serving
    #[arg(long)]
    pub install_only: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Apply command-line overrides, which take precedence over every other source.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
