//! Runtime configuration loaded from environment variables.
//!
//! `.env` files are honoured by the binaries (via `dotenvy`) before this is
//! read; every value has a development default except where noted.

use std::ops::RangeInclusive;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got `{value}`")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{0} must be set in production")]
    Missing(&'static str),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: Environment,
    /// Mount point of every resource route, e.g. `/api/v1`.
    pub base_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expire_days: i64,
    pub cookie_expire_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    /// `None` means mail is logged instead of sent.
    pub smtp: Option<SmtpConfig>,
    pub from_name: String,
    pub from_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Postgres URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
    pub mail: MailConfig,
    pub geocoder_api_key: Option<String>,
    pub rate_limit: RateLimitConfig,
}

const DEV_JWT_SECRET: &str = "devcamper-dev-secret";

/// Token and cookie lifetimes, in days.
const EXPIRE_DAYS: RangeInclusive<i64> = 1..=36_500;
/// Largest accepted photo, 1 GiB.
const UPLOAD_BYTES: RangeInclusive<usize> = 1..=1 << 30;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 5000,
                environment: Environment::Development,
                base_path: "/api/v1".to_string(),
            },
            database_url: None,
            auth: AuthConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expire_days: 30,
                cookie_expire_days: 30,
            },
            uploads: UploadConfig {
                dir: PathBuf::from("./public/uploads"),
                max_bytes: 1_000_000,
            },
            mail: MailConfig {
                smtp: None,
                from_name: "DevCamper".to_string(),
                from_email: "noreply@devcamper.io".to_string(),
            },
            geocoder_api_key: None,
            rate_limit: RateLimitConfig {
                window_secs: 600,
                max_requests: 100,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let environment = match get("APP_ENV").as_deref() {
            None | Some("development") => Environment::Development,
            Some("production") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "APP_ENV",
                    expected: "`development` or `production`",
                    value: other.to_string(),
                });
            }
        };

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == Environment::Production => {
                return Err(ConfigError::Missing("JWT_SECRET"));
            }
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                defaults.auth.jwt_secret
            }
        };

        let base_path = get("API_BASE_PATH")
            .map(|p| format!("/{}", p.trim_matches('/')))
            .unwrap_or(defaults.server.base_path);

        let smtp = match get("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse(&get, "SMTP_PORT", 587)?,
                username: get("SMTP_USER"),
                password: get("SMTP_PASS"),
            }),
            None => None,
        };

        Ok(Self {
            server: ServerConfig {
                port: parse(&get, "PORT", defaults.server.port)?,
                environment,
                base_path,
            },
            database_url: get("DATABASE_URL"),
            auth: AuthConfig {
                jwt_secret,
                jwt_expire_days: parse_in(&get, "JWT_EXPIRE_DAYS", defaults.auth.jwt_expire_days, EXPIRE_DAYS)?,
                cookie_expire_days: parse_in(
                    &get,
                    "JWT_COOKIE_EXPIRE_DAYS",
                    defaults.auth.cookie_expire_days,
                    EXPIRE_DAYS,
                )?,
            },
            uploads: UploadConfig {
                dir: get("FILE_UPLOAD_PATH").map(PathBuf::from).unwrap_or(defaults.uploads.dir),
                max_bytes: parse_in(&get, "FILE_UPLOAD_MAX", defaults.uploads.max_bytes, UPLOAD_BYTES)?,
            },
            mail: MailConfig {
                smtp,
                from_name: get("FROM_NAME").unwrap_or(defaults.mail.from_name),
                from_email: get("FROM_EMAIL").unwrap_or(defaults.mail.from_email),
            },
            geocoder_api_key: get("GEOCODER_API_KEY"),
            rate_limit: RateLimitConfig {
                window_secs: parse_in(&get, "RATE_LIMIT_WINDOW_SECS", defaults.rate_limit.window_secs, 1..=u64::MAX)?,
                max_requests: parse_in(&get, "RATE_LIMIT_MAX", defaults.rate_limit.max_requests, 1..=u32::MAX)?,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected: "a number",
            value: raw,
        }),
    }
}

/// Like `parse`, but the value must also fall inside `range`.
fn parse_in<T, G>(get: &G, key: &'static str, default: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd,
    G: Fn(&str) -> Option<String>,
{
    let value = parse(get, key, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            expected: "a number in the accepted range",
            value: get(key).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(from(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn values_are_parsed() {
        let cfg = from(&[
            ("PORT", "8080"),
            ("API_BASE_PATH", "api/v2/"),
            ("FILE_UPLOAD_MAX", "2048"),
            ("SMTP_HOST", "smtp.mailtrap.io"),
            ("SMTP_PORT", "2525"),
        ])
        .unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.base_path, "/api/v2");
        assert_eq!(cfg.uploads.max_bytes, 2048);
        assert_eq!(cfg.mail.smtp.map(|s| s.port), Some(2525));
    }

    #[test]
    fn malformed_numbers_are_errors() {
        assert_eq!(
            from(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid {
                key: "PORT",
                expected: "a number",
                value: "eighty".to_string(),
            })
        );
    }

    #[test]
    fn expiry_days_must_be_positive_and_bounded() {
        for raw in ["0", "-3", "9999999999999"] {
            for key in ["JWT_EXPIRE_DAYS", "JWT_COOKIE_EXPIRE_DAYS"] {
                assert!(
                    matches!(from(&[(key, raw)]), Err(ConfigError::Invalid { key: k, .. }) if k == key),
                    "{key}={raw}"
                );
            }
        }
        let cfg = from(&[("JWT_EXPIRE_DAYS", "36500"), ("JWT_COOKIE_EXPIRE_DAYS", "1")]).unwrap();
        assert_eq!(cfg.auth.jwt_expire_days, 36_500);
        assert_eq!(cfg.auth.cookie_expire_days, 1);
    }

    #[test]
    fn upload_limit_is_bounded() {
        assert!(from(&[("FILE_UPLOAD_MAX", "0")]).is_err());
        assert_eq!(
            from(&[("FILE_UPLOAD_MAX", "18446744073709551615")]),
            Err(ConfigError::Invalid {
                key: "FILE_UPLOAD_MAX",
                expected: "a number in the accepted range",
                value: "18446744073709551615".to_string(),
            })
        );
    }

    #[test]
    fn empty_rate_limit_budget_is_rejected() {
        assert!(from(&[("RATE_LIMIT_MAX", "0")]).is_err());
        assert!(from(&[("RATE_LIMIT_WINDOW_SECS", "0")]).is_err());
    }

    #[test]
    fn production_requires_a_secret() {
        assert_eq!(
            from(&[("APP_ENV", "production")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        );
        let cfg = from(&[("APP_ENV", "production"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert!(cfg.is_production());
    }
}
