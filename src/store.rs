use crate::error::CrawlError;
use chrono::{DateTime, FixedOffset};
use sqlx::{sqlite::SqliteConnectOptions, Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::debug;

/// SQLite-backed persistence for sites and deduplicated postings.
///
/// A posting's existence is permanent ground truth for "already seen": rows
/// are only ever inserted, never updated or deleted, and the composite
/// primary key on (site_name, title, link) keeps concurrent runs from
/// recording the same triple twice.
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Store, CrawlError> {
        let opt = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(opt).await?;
        let store = Store { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ensure_schema(&self) -> Result<(), CrawlError> {
        if !is_table_exists(&self.pool, "sites").await? {
            sqlx::query(
                "CREATE TABLE sites (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    url TEXT NOT NULL,
                    keywords TEXT NOT NULL DEFAULT ''
                 )",
            )
            .execute(&self.pool)
            .await?;
            debug!("Created sites");
        }
        if !is_table_exists(&self.pool, "postings").await? {
            sqlx::query(
                "CREATE TABLE postings (
                    site_name TEXT NOT NULL,
                    title TEXT NOT NULL,
                    link TEXT NOT NULL,
                    found_at DATETIME NOT NULL,
                    PRIMARY KEY (site_name, title, link)
                 )",
            )
            .execute(&self.pool)
            .await?;
            debug!("Created postings");
        }
        Ok(())
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>, CrawlError> {
        Ok(self.pool.begin().await?)
    }

    /// Atomic check-and-insert for one (site_name, title, link) triple inside
    /// the caller's transaction. Returns the discovery timestamp when the
    /// triple was absent, `None` when it was already recorded. A unique
    /// violation raced in by another runner counts as already recorded.
    pub async fn insert_if_new(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        site_name: &str,
        title: &str,
        link: &str,
    ) -> Result<Option<DateTime<FixedOffset>>, CrawlError> {
        let exists =
            sqlx::query("SELECT 1 FROM postings WHERE site_name = ? AND title = ? AND link = ?")
                .bind(site_name)
                .bind(title)
                .bind(link)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
        if exists {
            return Ok(None);
        }

        let found_at = get_now();
        let inserted =
            sqlx::query("INSERT INTO postings (site_name, title, link, found_at) VALUES (?, ?, ?, ?)")
                .bind(site_name)
                .bind(title)
                .bind(link)
                .bind(found_at)
                .execute(&mut *tx)
                .await;
        match inserted {
            Ok(_) => Ok(Some(found_at)),
            Err(sqlx::Error::Database(e))
                if matches!(e.code().as_deref(), Some("1555") | Some("2067")) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists_posting(
        &self,
        site_name: &str,
        title: &str,
        link: &str,
    ) -> Result<bool, CrawlError> {
        Ok(
            sqlx::query("SELECT 1 FROM postings WHERE site_name = ? AND title = ? AND link = ?")
                .bind(site_name)
                .bind(title)
                .bind(link)
                .fetch_optional(&self.pool)
                .await?
                .is_some(),
        )
    }

    pub async fn postings_count(&self) -> Result<u32, CrawlError> {
        Ok(sqlx::query("SELECT COUNT(*) FROM postings")
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?)
    }
}

pub(crate) async fn is_table_exists(
    pool: &SqlitePool,
    table_name: &str,
) -> Result<bool, CrawlError> {
    Ok(
        sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?
            .is_some(),
    )
}

pub(crate) fn get_now() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(
        &chrono::offset::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tokio::fs;

    async fn fresh_store(name: &str) -> Store {
        let file = format!("{}.db", name);
        if Path::new(&file).is_file() {
            fs::remove_file(&file).await.unwrap();
        }
        Store::connect(&format!("sqlite://{}", file)).await.unwrap()
    }

    #[tokio::test]
    async fn insert_if_new_returns_timestamp_exactly_once() {
        let store = fresh_store("test_store_dedup").await;

        let mut tx = store.begin().await.unwrap();
        let first = store.insert_if_new(&mut tx, "X", "T", "L").await.unwrap();
        assert!(first.is_some());
        let second = store.insert_if_new(&mut tx, "X", "T", "L").await.unwrap();
        assert_eq!(second, None);
        tx.commit().await.unwrap();

        assert_eq!(store.postings_count().await.unwrap(), 1);
        assert!(store.exists_posting("X", "T", "L").await.unwrap());

        // A later transaction still sees the committed posting.
        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            store.insert_if_new(&mut tx, "X", "T", "L").await.unwrap(),
            None
        );
        tx.commit().await.unwrap();
        assert_eq!(store.postings_count().await.unwrap(), 1);

        store.close().await;
        fs::remove_file("test_store_dedup.db").await.unwrap();
    }

    #[tokio::test]
    async fn triples_differing_in_any_field_are_distinct() {
        let store = fresh_store("test_store_triples").await;

        let mut tx = store.begin().await.unwrap();
        assert!(store
            .insert_if_new(&mut tx, "X", "T", "L")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .insert_if_new(&mut tx, "X", "T", "L2")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .insert_if_new(&mut tx, "X2", "T", "L")
            .await
            .unwrap()
            .is_some());
        tx.commit().await.unwrap();

        assert_eq!(store.postings_count().await.unwrap(), 3);

        store.close().await;
        fs::remove_file("test_store_triples.db").await.unwrap();
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_rows() {
        let store = fresh_store("test_store_rollback").await;

        {
            let mut tx = store.begin().await.unwrap();
            assert!(store
                .insert_if_new(&mut tx, "X", "T", "L")
                .await
                .unwrap()
                .is_some());
            // Dropped without commit.
        }

        assert_eq!(store.postings_count().await.unwrap(), 0);
        assert!(!store.exists_posting("X", "T", "L").await.unwrap());

        store.close().await;
        fs::remove_file("test_store_rollback.db").await.unwrap();
    }
}
