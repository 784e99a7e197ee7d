//! Token and cookie configuration.

use thiserror::Error;

/// Default access-token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TTL_SECONDS: u64 = 900;

/// Default refresh-token lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL_SECONDS: u64 = 604_800;

/// Auth configuration, normally read once at startup from the environment.
///
/// The two signing secrets must differ: compromising one token class must
/// not compromise the other.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_seconds: u64,
    pub refresh_ttl_seconds: u64,

    /// Clock-skew tolerance applied at verification.
    pub leeway_seconds: u64,

    /// Optional `Domain` attribute for credential cookies.
    pub cookie_domain: Option<String>,

    /// `Secure` on credential cookies. Disable only for non-TLS development.
    pub require_secure_cookies: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingSecret(&'static str),

    #[error("access and refresh token secrets must differ")]
    IdenticalSecrets,

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

impl AuthConfig {
    /// Build a config with default expiry windows from two distinct secrets.
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            leeway_seconds: 0,
            cookie_domain: None,
            require_secure_cookies: true,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from the environment.
    ///
    /// Recognized variables: `ACCESS_TOKEN_SECRET`, `REFRESH_TOKEN_SECRET`,
    /// `ACCESS_TOKEN_EXPIRY_SECS`, `REFRESH_TOKEN_EXPIRY_SECS`,
    /// `TOKEN_LEEWAY_SECS`, `COOKIE_DOMAIN`, `REQUIRE_SECURE_COOKIES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_secret = std::env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| ConfigError::MissingSecret("ACCESS_TOKEN_SECRET"))?;
        let refresh_secret = std::env::var("REFRESH_TOKEN_SECRET")
            .map_err(|_| ConfigError::MissingSecret("REFRESH_TOKEN_SECRET"))?;

        let config = Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds: env_u64("ACCESS_TOKEN_EXPIRY_SECS", DEFAULT_ACCESS_TTL_SECONDS)?,
            refresh_ttl_seconds: env_u64("REFRESH_TOKEN_EXPIRY_SECS", DEFAULT_REFRESH_TTL_SECONDS)?,
            leeway_seconds: env_u64("TOKEN_LEEWAY_SECS", 0)?,
            cookie_domain: std::env::var("COOKIE_DOMAIN").ok().filter(|d| !d.is_empty()),
            require_secure_cookies: env_bool("REQUIRE_SECURE_COOKIES", true)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() {
            return Err(ConfigError::MissingSecret("ACCESS_TOKEN_SECRET"));
        }
        if self.refresh_secret.is_empty() {
            return Err(ConfigError::MissingSecret("REFRESH_TOKEN_SECRET"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::IdenticalSecrets);
        }
        Ok(())
    }
}

fn env_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn env_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => match raw.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::InvalidValue { name, value: raw }),
        },
        Err(_) => Ok(default),
    }
}
