//! API server configuration.

use ktp_core::config::AppEnv;

/// Configuration for the HTTP layer.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:3000").
    pub bind_addr: String,
    /// Deployment environment; outside production the forgot-password
    /// response carries the raw reset token.
    pub app_env: AppEnv,
}

impl ApiConfig {
    pub fn expose_reset_token(&self) -> bool {
        !self.app_env.is_production()
    }
}
