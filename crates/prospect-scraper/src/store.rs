//! Subscriber store seam used by the sink and the scrape trigger.

use async_trait::async_trait;
use prospect_core::ListId;
use prospect_db::{email_lists, subscribers, Database, NewSubscriber};

/// Persistence operations the pipeline needs.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Insert a subscriber; `DatabaseError::DuplicateKey` if already present.
    async fn create(&self, subscriber: NewSubscriber) -> prospect_db::Result<()>;

    /// All emails already recorded for the list.
    async fn list_emails(&self, list_id: &ListId) -> prospect_db::Result<Vec<String>>;

    /// Records of the list whose source starts with `prefix`.
    async fn count_with_source_prefix(
        &self,
        list_id: &ListId,
        prefix: &str,
    ) -> prospect_db::Result<u64>;

    /// Whether the list exists.
    async fn list_exists(&self, list_id: &ListId) -> prospect_db::Result<bool>;
}

#[async_trait]
impl SubscriberStore for Database {
    async fn create(&self, subscriber: NewSubscriber) -> prospect_db::Result<()> {
        subscribers::create_subscriber(self.pool(), subscriber).await?;
        Ok(())
    }

    async fn list_emails(&self, list_id: &ListId) -> prospect_db::Result<Vec<String>> {
        subscribers::list_emails(self.pool(), list_id).await
    }

    async fn count_with_source_prefix(
        &self,
        list_id: &ListId,
        prefix: &str,
    ) -> prospect_db::Result<u64> {
        subscribers::count_with_source_prefix(self.pool(), list_id, prefix).await
    }

    async fn list_exists(&self, list_id: &ListId) -> prospect_db::Result<bool> {
        email_lists::email_list_exists(self.pool(), list_id).await
    }
}
