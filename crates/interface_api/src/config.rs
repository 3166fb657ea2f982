//! API configuration
//!
//! Every key has a default and can be overridden through `API_`-prefixed
//! environment variables (`API_PORT`, `API_SMTP_HOST`, ...).

use serde::Deserialize;

use domain_mail::{MailAddress, MailError, SmtpConfig, SmtpSecurity};

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Lifetime of a session row in seconds
    pub session_ttl_secs: u64,
    /// Database URL
    pub database_url: String,
    pub db_max_connections: u32,
    /// Log level
    pub log_level: String,
    /// SMTP relay; mail is only logged when unset
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_security: SmtpSecurity,
    /// Sender address of newsletters
    pub mail_from: String,
    /// Seconds between background maintenance runs
    pub maintenance_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            session_ttl_secs: domain_identity::DEFAULT_SESSION_TTL_SECS,
            database_url: "postgres://localhost/civic_crm".to_string(),
            db_max_connections: 10,
            log_level: "info".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_security: SmtpSecurity::StartTls,
            mail_from: "no-reply@localhost.localdomain".to_string(),
            maintenance_interval_secs: 60,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment, on top of the defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = ApiConfig::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port)?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_expiration_secs", defaults.jwt_expiration_secs)?
            .set_default("session_ttl_secs", defaults.session_ttl_secs)?
            .set_default("database_url", defaults.database_url)?
            .set_default("db_max_connections", defaults.db_max_connections)?
            .set_default("log_level", defaults.log_level)?
            .set_default("smtp_port", defaults.smtp_port)?
            .set_default("smtp_security", "starttls")?
            .set_default("mail_from", defaults.mail_from)?
            .set_default("maintenance_interval_secs", defaults.maintenance_interval_secs)?
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// SMTP settings, when a relay host is configured
    pub fn smtp(&self) -> Option<SmtpConfig> {
        let host = self.smtp_host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        Some(SmtpConfig {
            host: host.to_string(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            security: self.smtp_security,
            timeout_secs: 30,
        })
    }

    /// Parsed sender address, named after the organization sending
    pub fn sender(&self, organization: &str) -> Result<MailAddress, MailError> {
        MailAddress::new(&self.mail_from, Some(organization))
    }
}
