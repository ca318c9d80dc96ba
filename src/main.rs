use clap::Parser;
use lazy_regex::regex;
use posting_watcher::fetch::HttpFetcher;
use posting_watcher::notify::SmtpNotifier;
use posting_watcher::{runner, Config, Store};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

/// Crawl the configured sites and mail a digest of newly discovered postings.
#[derive(Debug, Parser)]
struct Args {
    /// Numeric id of a single site to crawl; absent or non-numeric crawls
    /// every site.
    site_id: Option<String>,
}

fn parse_site_filter(arg: Option<&str>) -> Option<i64> {
    arg.filter(|s| regex!(r"^[0-9]+$").is_match(s))
        .and_then(|s| s.parse().ok())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info,sqlx=warn".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let args = Args::parse();
    let filter_id = parse_site_filter(args.site_id.as_deref());

    let config = Config::from_env()?;
    let store = Store::connect(&config.database_url).await?;
    let fetcher = HttpFetcher::new()?;
    let notifier = SmtpNotifier::new(config.smtp);

    // The pool is released on every exit path, fatal errors included.
    let result = runner::run(&store, &fetcher, &notifier, filter_id).await;
    store.close().await;

    let summary = result?;
    let failed = summary
        .outcomes
        .iter()
        .filter(|o| o.result.is_err())
        .count();
    info!(
        "Run finished: {} new posting(s), {} site(s) failed",
        summary.new_items.len(),
        failed
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_site_filter;

    #[test]
    fn numeric_argument_selects_a_site() {
        assert_eq!(parse_site_filter(Some("7")), Some(7));
    }

    #[test]
    fn non_numeric_argument_means_all_sites() {
        assert_eq!(parse_site_filter(Some("all")), None);
        assert_eq!(parse_site_filter(Some("12x")), None);
        assert_eq!(parse_site_filter(Some("")), None);
        assert_eq!(parse_site_filter(None), None);
    }
}
