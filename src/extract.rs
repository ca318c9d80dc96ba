use crate::error::CrawlError;
use lazy_static::lazy_static;
use reqwest::Url;
use scraper::{Html, Selector};

lazy_static! {
    static ref A: Selector = Selector::parse("a").expect("Invalid selector");
}

/// A candidate extracted from a page, before the dedup check.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Entry {
    pub title: String,
    pub link: String,
}

/// Scans every anchor of the page in document order and keeps the ones whose
/// visible text matches the site's keyword filter.
///
/// The filter is a comma-separated keyword list; an empty filter keeps every
/// anchor with non-empty text. Matching is a case-insensitive substring test.
/// Hrefs are resolved against `base_url`; anchors without an href, with an
/// href that does not resolve, or with empty visible text are dropped.
/// Repeats within one page are kept as-is, the store collapses them.
pub fn extract(html: &str, base_url: &str, keyword_filter: &str) -> Result<Vec<Entry>, CrawlError> {
    let base =
        Url::parse(base_url).map_err(|_| CrawlError::InvalidBaseUrl(base_url.to_string()))?;
    let keywords = parse_keywords(keyword_filter);

    let doc = Html::parse_document(html);
    let mut entries = Vec::new();
    for a in doc.select(&A) {
        let title = a.text().collect::<String>().trim().to_string();
        let href = match a.value().attr("href") {
            Some(href) if !href.is_empty() => href,
            _ => continue,
        };
        let link = match base.join(href) {
            Ok(url) => url.to_string(),
            Err(_) => continue,
        };
        if !keywords.is_empty() {
            let text = title.to_lowercase();
            if !keywords.iter().any(|k| text.contains(k.as_str())) {
                continue;
            }
        }
        if title.is_empty() {
            continue;
        }
        entries.push(Entry { title, link });
    }
    Ok(entries)
}

fn parse_keywords(filter: &str) -> Vec<String> {
    filter
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_lowercase)
        .collect()
}
