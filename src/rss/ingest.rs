//! Ingestion of a fetched feed document into the post store.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::datetime::parse_pub_date;
use crate::error::StoreError;
use crate::rss::store::PostStore;
use crate::rss::types::{FeedDocument, InsertOutcome, IngestReport, NewPost};

/// A store failure that stopped ingestion part-way through a document.
#[derive(Debug, Error)]
#[error("ingestion aborted after {} stored item(s): {source}", .report.inserted)]
pub struct IngestError {
    /// Counts up to the failure. The failing item and every item after it are
    /// counted as `failed`.
    pub report: IngestReport,
    pub source: StoreError,
}

/// Store every item of `document` as a post of `feed_id`, in document order.
///
/// Items already stored (same URL) are counted as duplicates. An unparsable
/// `pubDate` leaves the post undated. Items without a link are skipped. Any
/// other store failure aborts the remaining items.
pub async fn ingest<P: PostStore + ?Sized>(
    store: &P,
    feed_id: Uuid,
    document: &FeedDocument,
    now: DateTime<Utc>,
) -> Result<IngestReport, IngestError> {
    let mut report = IngestReport::default();

    for (index, item) in document.items.iter().enumerate() {
        if item.link.trim().is_empty() {
            debug!("Skipping item without link: {:?}", item.title);
            report.skipped += 1;
            continue;
        }

        let published_at = parse_pub_date(&item.pub_date);
        if published_at.is_none() {
            warn!(
                "Could not parse pubDate {:?} of {}; storing without date",
                item.pub_date, item.link
            );
        }

        let post = NewPost::new(feed_id, item.title.clone(), item.link.clone(), now)
            .with_description(item.description.clone())
            .with_published_at(published_at);

        match store.insert_post(&post).await {
            Ok(InsertOutcome::Inserted) => {
                debug!("Stored post {:?} ({})", post.title, post.url);
                report.inserted += 1;
                if published_at.is_none() {
                    report.undated += 1;
                }
            }
            Ok(InsertOutcome::Duplicate) => {
                debug!("Post already stored: {}", item.link);
                report.duplicates += 1;
            }
            Err(source) => {
                report.failed += document.items.len() - index;
                return Err(IngestError { report, source });
            }
        }
    }

    Ok(report)
}
