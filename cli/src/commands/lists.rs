use crate::error::CommandError;
use crate::state::AppState;
use prospect_core::ListId;
use prospect_db::{email_lists, subscribers, EmailList};
use prospect_scraper::SCRAPED_SOURCE_PREFIX;
use serde::Serialize;
use std::fmt;

/// A list together with its scraped subscriber count.
#[derive(Debug, Clone, Serialize)]
pub struct ListSummary {
    #[serde(flatten)]
    pub list: EmailList,
    pub scraped_count: u64,
}

/// All lists, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ListsReport {
    pub lists: Vec<ListSummary>,
}

pub async fn list_lists(state: &AppState) -> Result<ListsReport, CommandError> {
    let pool = state.db.pool();
    let mut lists = Vec::new();
    for list in email_lists::list_email_lists(pool).await? {
        let id = ListId::new(list.id.clone())?;
        let scraped_count =
            subscribers::count_with_source_prefix(pool, &id, SCRAPED_SOURCE_PREFIX).await?;
        lists.push(ListSummary {
            list,
            scraped_count,
        });
    }
    Ok(ListsReport { lists })
}

pub async fn create_list(
    state: &AppState,
    name: String,
    id: Option<String>,
    description: Option<String>,
) -> Result<EmailList, CommandError> {
    if name.trim().is_empty() {
        return Err(CommandError::new("INVALID_REQUEST", "List name is required"));
    }
    let id = match id {
        Some(id) => ListId::new(id)?,
        None => ListId::generate(),
    };

    let list = email_lists::create_email_list(state.db.pool(), &id, name, description).await?;
    tracing::info!("Created email list {}", list.id);
    Ok(list)
}

impl fmt::Display for ListsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lists.is_empty() {
            return writeln!(f, "No email lists yet. Create one with `prospect lists create`.");
        }
        for summary in &self.lists {
            writeln!(
                f,
                "{}  {}  ({} scraped)",
                summary.list.id, summary.list.name, summary.scraped_count
            )?;
        }
        Ok(())
    }
}

/// Rendering of a freshly created list.
pub struct Created<'a>(pub &'a EmailList);

impl fmt::Display for Created<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Created list {} ({})", self.0.id, self.0.name)
    }
}
