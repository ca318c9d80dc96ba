use crate::error::CrawlError;
use crate::extract;
use crate::fetch::Fetcher;
use crate::notify::Notifier;
use crate::registry::{self, Site};
use crate::store::Store;
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

/// A posting first recorded during the current run, destined for the digest.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NewItem {
    pub site_name: String,
    pub title: String,
    pub link: String,
    pub found_at: DateTime<FixedOffset>,
}

/// Per-site result, kept instead of discarding the failure reason.
#[derive(Debug)]
pub struct SiteOutcome {
    pub site_name: String,
    pub result: Result<usize, CrawlError>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub new_items: Vec<NewItem>,
    pub outcomes: Vec<SiteOutcome>,
}

/// Crawls every configured site (or the one selected by `filter_id`)
/// sequentially, records newly discovered postings and mails the digest when
/// anything new turned up.
///
/// Failure to obtain the site list is fatal. A failure inside one site's unit
/// of work rolls that site back and the run continues; the reason survives in
/// the site's outcome. A notification failure propagates even though the
/// postings are already committed.
pub async fn run<F, N>(
    store: &Store,
    fetcher: &F,
    notifier: &N,
    filter_id: Option<i64>,
) -> Result<RunSummary, CrawlError>
where
    F: Fetcher + Sync,
    N: Notifier + Sync,
{
    let sites = registry::list_sites(store.pool(), filter_id).await?;
    info!("Crawling {} site(s)", sites.len());

    let mut new_items = Vec::new();
    let mut outcomes = Vec::new();
    for site in &sites {
        match process_site(store, fetcher, site).await {
            Ok(items) => {
                debug!("{}: {} new posting(s)", site.name, items.len());
                outcomes.push(SiteOutcome {
                    site_name: site.name.clone(),
                    result: Ok(items.len()),
                });
                new_items.extend(items);
            }
            Err(e) => {
                warn!("{}: crawl failed: {}", site.name, e);
                outcomes.push(SiteOutcome {
                    site_name: site.name.clone(),
                    result: Err(e),
                });
            }
        }
    }

    if !new_items.is_empty() {
        notifier.notify(&new_items).await?;
    }

    Ok(RunSummary {
        new_items,
        outcomes,
    })
}

/// One site's unit of work: fetch, extract, check-and-insert every entry
/// inside a single transaction. An error anywhere drops the transaction, so a
/// site that fails mid-extraction leaves no partial rows.
async fn process_site<F: Fetcher>(
    store: &Store,
    fetcher: &F,
    site: &Site,
) -> Result<Vec<NewItem>, CrawlError> {
    let body = fetcher.fetch(&site.url).await?;
    let entries = extract::extract(&body, &site.url, &site.keywords)?;

    let mut tx = store.begin().await?;
    let mut items = Vec::new();
    for entry in entries {
        if let Some(found_at) = store
            .insert_if_new(&mut tx, &site.name, &entry.title, &entry.link)
            .await?
        {
            items.push(NewItem {
                site_name: site.name.clone(),
                title: entry.title,
                link: entry.link,
                found_at,
            });
        }
    }
    tx.commit().await?;
    Ok(items)
}
