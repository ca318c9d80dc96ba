#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("Database error")]
    Database(#[from] sqlx::error::Error),

    #[error("Fetch error")]
    Fetch(#[from] reqwest::Error),

    #[error("Invalid base url: {0}")]
    InvalidBaseUrl(String),

    #[error("Missing configuration key {0}")]
    MissingConfig(&'static str),

    #[error("Invalid configuration value for {0}")]
    InvalidConfig(&'static str),

    #[error("Mail delivery error")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Mail message error")]
    Mail(#[from] lettre::error::Error),

    #[error("Invalid mail address")]
    Address(#[from] lettre::address::AddressError),
}
