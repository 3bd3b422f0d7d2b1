use crate::error::CommandError;
use crate::state::AppState;
use prospect_core::ListId;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub list_id: String,
    pub scraped_count: u64,
}

/// Count the scraped subscribers of a list.
///
/// Reads the store directly, so no provider key is needed.
pub async fn scrape_status(state: &AppState, list: &str) -> Result<StatusReport, CommandError> {
    let list_id = ListId::new(list)?;
    let status = prospect_scraper::scrape_status(state.db.as_ref(), &list_id).await?;

    Ok(StatusReport {
        list_id: list_id.to_string(),
        scraped_count: status.scraped_count,
    })
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {} scraped subscribers", self.list_id, self.scraped_count)
    }
}
