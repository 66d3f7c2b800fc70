//! Command line and environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use url::Url;

/// Consent page backend: hosts authorization flows and forwards decisions to
/// the authorization service.
#[derive(Parser, Debug, Clone)]
#[command(name = "astronauth-consent")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "CONSENT_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// Base URL of the authorization service
    #[arg(
        long,
        env = "CONSENT_AUTHORIZATION_SERVICE_URL",
        default_value = "http://127.0.0.1:8000/"
    )]
    pub authorization_service_url: Url,

    /// Timeout for each call to the authorization service, in seconds
    #[arg(long, env = "CONSENT_SERVICE_TIMEOUT_SECS", default_value_t = 10)]
    pub service_timeout_secs: u64,

    /// Seconds a consent flow may go untouched before it is discarded
    #[arg(
        long,
        env = "CONSENT_FLOW_IDLE_TIMEOUT_SECS",
        default_value_t = 900,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub flow_idle_timeout_secs: u64,

    /// Log filter, in `tracing_subscriber::EnvFilter` syntax
    #[arg(long, env = "CONSENT_LOG", default_value = "info")]
    pub log: String,
}

impl Config {
    pub fn service_timeout(&self) -> Duration {
        Duration::from_secs(self.service_timeout_secs)
    }

    pub fn flow_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.flow_idle_timeout_secs)
    }
}
