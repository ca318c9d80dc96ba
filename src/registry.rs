use crate::error::CrawlError;
use futures::TryStreamExt;
use sqlx::{Row, SqlitePool};

/// A configured crawl target. Rows are externally managed; the crawl run only
/// ever reads them. `name` is the dedup partition key for postings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub keywords: String,
}

/// With a filter id this yields zero or one site, otherwise every configured
/// site ordered by id.
pub async fn list_sites(
    pool: &SqlitePool,
    filter_id: Option<i64>,
) -> Result<Vec<Site>, CrawlError> {
    let mut rows = match filter_id {
        Some(id) => sqlx::query("SELECT id, name, url, keywords FROM sites WHERE id = ?")
            .bind(id)
            .fetch(pool),
        None => sqlx::query("SELECT id, name, url, keywords FROM sites ORDER BY id").fetch(pool),
    };

    let mut sites = Vec::new();
    while let Some(row) = rows.try_next().await? {
        sites.push(Site {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            url: row.try_get("url")?,
            keywords: row.try_get("keywords")?,
        });
    }
    Ok(sites)
}

pub async fn insert_site(
    pool: &SqlitePool,
    name: &str,
    url: &str,
    keywords: &str,
) -> Result<i64, CrawlError> {
    let done = sqlx::query("INSERT INTO sites (name, url, keywords) VALUES (?, ?, ?)")
        .bind(name)
        .bind(url)
        .bind(keywords)
        .execute(pool)
        .await?;
    Ok(done.last_insert_rowid())
}
