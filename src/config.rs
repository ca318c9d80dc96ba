use crate::error::CrawlError;

pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Process-wide configuration, read from the environment once at startup and
/// passed by parameter into the components that need it.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub smtp: SmtpConfig,
}

/// Digest delivery settings. Every field except `port` may be absent; the
/// notifier turns into a silent no-op when `host`, `sender` or `recipients`
/// are unconfigured.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub sender: Option<String>,
    pub recipients: Vec<String>,
}

impl Default for SmtpConfig {
    fn default() -> SmtpConfig {
        SmtpConfig {
            host: None,
            port: DEFAULT_SMTP_PORT,
            username: None,
            password: None,
            sender: None,
            recipients: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, CrawlError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(get: F) -> Result<Config, CrawlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL").ok_or(CrawlError::MissingConfig("DATABASE_URL"))?;

        let port = match get("SMTP_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| CrawlError::InvalidConfig("SMTP_PORT"))?,
            None => DEFAULT_SMTP_PORT,
        };

        let recipients = get("EMAIL_TO")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            database_url,
            smtp: SmtpConfig {
                host: get("SMTP_HOST"),
                port,
                username: get("SMTP_USER"),
                password: get("SMTP_PASS"),
                sender: get("EMAIL_FROM"),
                recipients,
            },
        })
    }
}
