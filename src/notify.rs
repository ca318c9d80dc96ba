use crate::config::SmtpConfig;
use crate::error::CrawlError;
use crate::runner::NewItem;
use itertools::Itertools;
use lettre::{
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport, Message,
    Tokio1Executor,
};
use tracing::{debug, info};

pub const DIGEST_SUBJECT: &str = "New scraped entries";

/// Digest delivery seam for the crawl runner.
#[async_trait::async_trait]
pub trait Notifier {
    async fn notify(&self, items: &[NewItem]) -> Result<(), CrawlError>;
}

/// Sends the run's digest over SMTP with STARTTLS. Silently does nothing when
/// the host, sender or recipient list is unconfigured, or when there is
/// nothing to report. Delivery failures propagate to the caller.
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> SmtpNotifier {
        SmtpNotifier { config }
    }
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, items: &[NewItem]) -> Result<(), CrawlError> {
        let (host, sender) = match (&self.config.host, &self.config.sender) {
            (Some(host), Some(sender)) => (host, sender),
            _ => {
                debug!("Mail delivery not configured, skipping digest");
                return Ok(());
            }
        };
        if self.config.recipients.is_empty() || items.is_empty() {
            return Ok(());
        }

        let mut message = Message::builder()
            .from(sender.parse()?)
            .subject(DIGEST_SUBJECT);
        for recipient in &self.config.recipients {
            message = message.to(recipient.parse()?);
        }
        let email = message.body(render_digest(items))?;

        let mut transport =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(self.config.port);
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            transport = transport.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        transport.build().send(email).await?;

        info!(
            "Sent digest with {} entries to {} recipients",
            items.len(),
            self.config.recipients.len()
        );
        Ok(())
    }
}

/// One block per item, blocks separated by a blank line.
pub fn render_digest(items: &[NewItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "Site: {}\nTitle: {}\nFound: {}\nURL: {}\n",
                item.site_name, item.title, item.found_at, item.link
            )
        })
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    fn item(site: &str, title: &str, link: &str) -> NewItem {
        NewItem {
            site_name: site.to_string(),
            title: title.to_string(),
            link: link.to_string(),
            found_at: DateTime::parse_from_rfc3339("2023-01-15T09:30:00+00:00").unwrap(),
        }
    }

    #[test]
    fn digest_blocks_are_separated_by_a_blank_line() {
        let items = vec![
            item("Acme", "We are hiring!", "https://acme.test/a"),
            item("Globex", "Remote Engineer", "https://globex.test/b"),
        ];

        let first = &items[0];
        let second = &items[1];
        let expected = format!(
            "Site: {}\nTitle: {}\nFound: {}\nURL: {}\n\n\nSite: {}\nTitle: {}\nFound: {}\nURL: {}\n",
            first.site_name,
            first.title,
            first.found_at,
            first.link,
            second.site_name,
            second.title,
            second.found_at,
            second.link,
        );
        assert_eq!(render_digest(&items), expected);
    }

    #[tokio::test]
    async fn unconfigured_host_is_a_silent_noop() {
        let notifier = SmtpNotifier::new(SmtpConfig {
            sender: Some("bot@example.com".to_string()),
            recipients: vec!["a@example.com".to_string()],
            ..SmtpConfig::default()
        });
        notifier
            .notify(&[item("Acme", "T", "https://acme.test/a")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unconfigured_sender_is_a_silent_noop() {
        let notifier = SmtpNotifier::new(SmtpConfig {
            host: Some("mail.example.com".to_string()),
            recipients: vec!["a@example.com".to_string()],
            ..SmtpConfig::default()
        });
        notifier
            .notify(&[item("Acme", "T", "https://acme.test/a")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_recipient_list_is_a_silent_noop() {
        let notifier = SmtpNotifier::new(SmtpConfig {
            host: Some("mail.example.com".to_string()),
            sender: Some("bot@example.com".to_string()),
            ..SmtpConfig::default()
        });
        notifier
            .notify(&[item("Acme", "T", "https://acme.test/a")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_item_list_is_a_silent_noop() {
        let notifier = SmtpNotifier::new(SmtpConfig {
            host: Some("mail.example.com".to_string()),
            sender: Some("bot@example.com".to_string()),
            recipients: vec!["a@example.com".to_string()],
            ..SmtpConfig::default()
        });
        notifier.notify(&[]).await.unwrap();
    }
}
