// crates/core/src/config.rs
//! Dashboard configuration loaded from environment variables.
//!
//! Loading is all-or-nothing: the first invalid or missing variable aborts
//! with a [`ConfigError`] naming it. The binary treats that as fatal.

use std::fmt;

use crate::domain::{full_match_regex, ClientClassifier};
use crate::error::ConfigError;

/// A value that must never show up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Read-only connection settings for the backbone database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub hostname: String,
    pub port: u16,
    pub user: String,
    pub password: Secret,
    pub database: String,
    pub target_encrypt_connection: bool,
    pub trust_server_certificate: bool,
}

impl DatabaseConfig {
    /// ODBC connection string for a read-only SQL Server session.
    pub fn connection_string(&self) -> String {
        fn yes_no(flag: bool) -> &'static str {
            if flag {
                "yes"
            } else {
                "no"
            }
        }
        format!(
            "SERVER={},{};UID={};PWD={};DATABASE={};Driver=ODBC Driver 18 for SQL Server;\
             TargetEncryptConnection={};TrustServerCertificate={};",
            self.hostname,
            self.port,
            self.user,
            self.password.expose(),
            self.database,
            yes_no(self.target_encrypt_connection),
            yes_no(self.trust_server_certificate),
        )
    }
}

/// Complete dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub database: DatabaseConfig,
    pub hostname: String,
    pub port: u16,
    pub classifier: ClientClassifier,
    /// Initial state of the "hide test clients" toggle and checkboxes.
    pub hide_test_clients_default: bool,
}

impl DashboardConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };
        let database = DatabaseConfig {
            hostname: env.string("MSSQL_HOSTNAME")?,
            port: env.port("MSSQL_PORT")?,
            user: env.string("MSSQL_USER")?,
            password: Secret::new(env.string("MSSQL_PASSWORD")?),
            database: env.string("MSSQL_DB")?,
            target_encrypt_connection: env.boolean("MSSQL_TARGET_ENCRYPT_CONNECTION")?,
            trust_server_certificate: env.boolean("MSSQL_TRUST_SERVER_CERTIFICATE")?,
        };
        let classifier = ClientClassifier::new(
            env.regex("DASHBOARD_APP_CLIENTS_REGEX")?,
            env.regex("DASHBOARD_TEST_CLIENTS_REGEX")?,
        );
        let config = Self {
            database,
            hostname: env.string("DASHBOARD_HOSTNAME")?,
            port: env.port("DASHBOARD_PORT")?,
            classifier,
            hide_test_clients_default: env.boolean("DASHBOARD_HIDE_TEST_CLIENTS_DEFAULT")?,
        };
        tracing::debug!(
            hostname = %config.hostname,
            port = config.port,
            hide_test_clients_default = config.hide_test_clients_default,
            "Loaded dashboard configuration"
        );
        Ok(config)
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn string(&self, name: &'static str) -> Result<String, ConfigError> {
        (self.lookup)(name).ok_or_else(|| ConfigError::missing(name))
    }

    fn port(&self, name: &'static str) -> Result<u16, ConfigError> {
        let raw = self.string(name)?;
        parse_port(&raw).ok_or_else(|| ConfigError::invalid_port(name, raw))
    }

    fn boolean(&self, name: &'static str) -> Result<bool, ConfigError> {
        let raw = self.string(name)?;
        parse_true_false(&raw).ok_or_else(|| ConfigError::invalid_bool(name, raw))
    }

    fn regex(&self, name: &'static str) -> Result<regex_lite::Regex, ConfigError> {
        let raw = self.string(name)?;
        full_match_regex(&raw).map_err(|source| ConfigError::InvalidRegex { name, source })
    }
}

/// Strict boolean: exactly `true` or `false`.
pub fn parse_true_false(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// TCP port in the range 1-65535.
pub fn parse_port(value: &str) -> Option<u16> {
    value.parse::<u16>().ok().filter(|port| *port != 0)
}
