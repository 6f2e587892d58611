//! arXiv API client
//!
//! Talks to the arXiv Atom query API:
//! - Paged requests (`start`, `max_results`, `sortBy`, `sortOrder`)
//! - Fixed delay between page requests
//! - Exponential backoff on transient failures
//! - Lazily paged record stream
//!
//! arXiv-specific Atom extensions that the feed parser does not surface
//! (affiliation, journal ref, comment) are treated as absent.

use crate::errors::{SourceError, SourceResult};
use crate::source::{PaperSource, SourceQuery};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoffBuilder};
use feed_rs::model::Entry;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use pulse_common::config::SourceConfig;
use pulse_common::{Author, RemoteRecord, VERSION};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// arXiv Atom API client
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
    page_size: usize,
    page_delay: Duration,
    max_retries: u32,
}

/// Position in a paged remote search
#[derive(Debug, Clone, Copy)]
struct PageCursor {
    start: usize,
    remaining: usize,
}

impl ArxivClient {
    /// Create a client from source configuration
    pub fn new(config: &SourceConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("paper-pulse/{}", VERSION))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            page_size: config.page_size.max(1),
            page_delay: Duration::from_millis(config.page_delay_ms),
            max_retries: config.max_retries,
        })
    }

    /// Fetch one page, retrying transient failures with exponential backoff
    async fn fetch_page(&self, params: &[(&str, String)]) -> SourceResult<Vec<RemoteRecord>> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_secs(1))
            .with_max_interval(Duration::from_secs(30))
            .with_max_elapsed_time(None)
            .build();

        let max_retries = self.max_retries;
        let mut attempts = 0u32;

        let body = retry(policy, || {
            attempts += 1;
            let attempt = attempts;
            async move {
                self.request_once(params).await.map_err(|e| {
                    if e.is_transient() && attempt <= max_retries {
                        warn!(attempt, max_retries, error = %e, "arXiv request failed, retrying");
                        backoff::Error::transient(e)
                    } else if e.is_transient() {
                        backoff::Error::permanent(SourceError::RetriesExhausted {
                            attempts: attempt,
                            message: e.to_string(),
                        })
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await?;

        parse_feed(&body)
    }

    async fn request_once(&self, params: &[(&str, String)]) -> SourceResult<String> {
        let response = self.client.get(&self.base_url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// Fetch the page at `cursor`; `None` once the search is exhausted
    async fn next_page(
        &self,
        query: &SourceQuery,
        cursor: PageCursor,
    ) -> SourceResult<Option<(Vec<RemoteRecord>, PageCursor)>> {
        if cursor.remaining == 0 {
            return Ok(None);
        }
        if cursor.start > 0 && !self.page_delay.is_zero() {
            tokio::time::sleep(self.page_delay).await;
        }

        let batch = self.page_size.min(cursor.remaining);
        let params = [
            ("search_query", query.query.clone()),
            ("start", cursor.start.to_string()),
            ("max_results", batch.to_string()),
            ("sortBy", query.sort_by.as_str().to_string()),
            ("sortOrder", query.sort_order.as_str().to_string()),
        ];

        let mut records = self.fetch_page(&params).await?;
        debug!(start = cursor.start, received = records.len(), "arXiv page fetched");

        if records.is_empty() {
            return Ok(None);
        }

        let received = records.len();
        records.truncate(cursor.remaining);
        let next = PageCursor {
            start: cursor.start + received,
            remaining: cursor.remaining.saturating_sub(received),
        };

        Ok(Some((records, next)))
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    fn search(&self, query: SourceQuery) -> BoxStream<'_, SourceResult<RemoteRecord>> {
        let cursor = PageCursor {
            start: 0,
            remaining: query.max_results,
        };

        stream::try_unfold(cursor, move |cursor| {
            let query = query.clone();
            async move { self.next_page(&query, cursor).await }
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, SourceError>)))
        .try_flatten()
        .boxed()
    }

    #[instrument(skip(self), fields(count = ids.len()))]
    async fn fetch_by_ids(&self, ids: &[String]) -> SourceResult<Vec<RemoteRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let params = [
            ("id_list", ids.join(",")),
            ("start", "0".to_string()),
            ("max_results", ids.len().to_string()),
        ];
        self.fetch_page(&params).await
    }

    fn name(&self) -> &'static str {
        "arxiv"
    }
}

/// Parse an arXiv Atom response into records
pub fn parse_feed(body: &str) -> SourceResult<Vec<RemoteRecord>> {
    let feed = feed_rs::parser::parse(body.as_bytes())
        .map_err(|e| SourceError::Parse(e.to_string()))?;

    let mut records = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        if entry.id.contains("/api/errors") {
            let message = entry
                .summary
                .map(|s| s.content)
                .unwrap_or_else(|| entry.id.clone());
            return Err(SourceError::Api(collapse_whitespace(&message)));
        }
        records.push(entry_to_record(entry));
    }
    Ok(records)
}

fn entry_to_record(entry: Entry) -> RemoteRecord {
    let external_id = entry
        .id
        .rsplit_once("/abs/")
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| entry.id.clone());

    let categories: Vec<String> = entry
        .categories
        .iter()
        .map(|c| c.term.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let pdf_url = entry
        .links
        .iter()
        .find(|l| {
            l.title.as_deref() == Some("pdf")
                || l.media_type.as_deref() == Some("application/pdf")
        })
        .map(|l| l.href.clone());

    let doi = entry
        .links
        .iter()
        .find(|l| l.title.as_deref() == Some("doi"))
        .map(|l| match l.href.split_once("doi.org/") {
            Some((_, doi)) => doi.to_string(),
            None => l.href.clone(),
        });

    RemoteRecord {
        external_id,
        title: entry
            .title
            .map(|t| collapse_whitespace(&t.content))
            .unwrap_or_default(),
        authors: entry
            .authors
            .into_iter()
            .map(|p| Author::new(collapse_whitespace(&p.name)))
            .collect(),
        abstract_text: entry
            .summary
            .map(|s| collapse_whitespace(&s.content))
            .unwrap_or_default(),
        primary_category: categories.first().cloned(),
        categories,
        published: entry.published.map(|d| d.naive_utc()),
        updated: entry.updated.map(|d| d.naive_utc()),
        pdf_url,
        doi,
        journal_ref: None,
        comment: None,
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <id>http://arxiv.org/api/query</id>
  <title>arXiv Query</title>
  <updated>2024-01-05T00:00:00-05:00</updated>
  <entry>
    <id>http://arxiv.org/abs/2401.01234v2</id>
    <updated>2024-01-04T10:00:00Z</updated>
    <published>2024-01-03T09:30:00Z</published>
    <title>Graph networks
      for crystal property prediction</title>
    <summary>  We present a model
      for crystals. </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/2401.01234v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2401.01234v2" rel="related" type="application/pdf"/>
    <link title="doi" href="http://dx.doi.org/10.1000/xyz123" rel="related"/>
    <arxiv:primary_category term="cond-mat.mtrl-sci" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cond-mat.mtrl-sci" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    const ERROR_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>http://arxiv.org/api/query</id>
  <title>arXiv Query</title>
  <updated>2024-01-05T00:00:00-05:00</updated>
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_bogus</id>
    <title>Error</title>
    <summary>incorrect id format for bogus</summary>
    <updated>2024-01-05T00:00:00-05:00</updated>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_entry() {
        let records = parse_feed(FEED).unwrap();
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.external_id, "2401.01234v2");
        assert_eq!(r.title, "Graph networks for crystal property prediction");
        assert_eq!(r.abstract_text, "We present a model for crystals.");
        assert_eq!(r.authors.len(), 2);
        assert_eq!(r.authors[1].name, "Alan Turing");
        assert_eq!(r.categories, vec!["cond-mat.mtrl-sci", "cs.LG"]);
        assert_eq!(r.primary_category.as_deref(), Some("cond-mat.mtrl-sci"));
        assert_eq!(r.pdf_url.as_deref(), Some("http://arxiv.org/pdf/2401.01234v2"));
        assert_eq!(r.doi.as_deref(), Some("10.1000/xyz123"));
        assert_eq!(
            r.published,
            NaiveDate::from_ymd_opt(2024, 1, 3).and_then(|d| d.and_hms_opt(9, 30, 0))
        );
    }

    #[test]
    fn test_parse_error_feed() {
        let err = parse_feed(ERROR_FEED).unwrap_err();
        assert!(matches!(err, SourceError::Api(ref m) if m.contains("incorrect id format")));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_feed("not xml at all"), Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_client_from_config() {
        let client = ArxivClient::new(&SourceConfig::default()).unwrap();
        assert_eq!(client.page_size, 100);
        assert_eq!(client.max_retries, 3);
        assert_eq!(client.name(), "arxiv");
    }
}
