//! Server configuration and secret provisioning

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use secrecy::SecretString;

/// Secrets shorter than this are rejected in production.
pub const MIN_SECRET_LEN: usize = 32;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::UnknownEnvironment(other.to_owned())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SECRET_KEY must be set in production")]
    MissingSecret,

    #[error("SECRET_KEY must be at least {MIN_SECRET_LEN} bytes, got {0}")]
    WeakSecret(usize),

    #[error("unknown environment '{0}' (expected development or production)")]
    UnknownEnvironment(String),
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub environment: Environment,
    pub secret_key: SecretString,
    pub session_ttl: Duration,
}

impl ServerConfig {
    /// Session cookies carry `Secure` outside development.
    pub fn cookie_secure(&self) -> bool {
        self.environment.is_production()
    }
}

/// Pick the signing secret for `env`.
///
/// Production requires an explicit, long enough key. Development falls back
/// to a random per-process key, so sessions do not survive a restart.
pub fn resolve_secret(
    env: Environment,
    provided: Option<String>,
) -> Result<SecretString, ConfigError> {
    let provided = provided.filter(|s| !s.is_empty());

    match (env, provided) {
        (_, Some(key)) if key.len() >= MIN_SECRET_LEN => Ok(SecretString::from(key)),
        (Environment::Production, Some(key)) => Err(ConfigError::WeakSecret(key.len())),
        (Environment::Production, None) => Err(ConfigError::MissingSecret),
        (Environment::Development, Some(key)) => {
            tracing::warn!(len = key.len(), "SECRET_KEY is short, acceptable only in development");
            Ok(SecretString::from(key))
        }
        (Environment::Development, None) => {
            tracing::warn!(
                "SECRET_KEY not set, generated a random key; sessions will not survive restart"
            );
            Ok(random_secret())
        }
    }
}

fn random_secret() -> SecretString {
    let bytes: [u8; 32] = rand::random();
    SecretString::from(format!("$rand${}", URL_SAFE_NO_PAD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!("Development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn default_environment_is_production() {
        assert_eq!(Environment::default(), Environment::Production);
    }

    #[test]
    fn production_requires_secret() {
        assert!(matches!(
            resolve_secret(Environment::Production, None),
            Err(ConfigError::MissingSecret)
        ));
        assert!(matches!(
            resolve_secret(Environment::Production, Some(String::new())),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn production_rejects_short_secret() {
        assert!(matches!(
            resolve_secret(Environment::Production, Some("short".into())),
            Err(ConfigError::WeakSecret(5))
        ));
    }

    #[test]
    fn production_accepts_long_secret() {
        let key = "k".repeat(MIN_SECRET_LEN);
        let secret = resolve_secret(Environment::Production, Some(key.clone())).unwrap();
        assert_eq!(secret.expose_secret(), key);
    }

    #[test]
    fn development_generates_distinct_keys() {
        let a = resolve_secret(Environment::Development, None).unwrap();
        let b = resolve_secret(Environment::Development, None).unwrap();
        assert!(a.expose_secret().starts_with("$rand$"));
        assert!(a.expose_secret().len() >= MIN_SECRET_LEN);
        assert_ne!(a.expose_secret(), b.expose_secret());
    }
}
