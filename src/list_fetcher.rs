//! Assembles a full followers/following list from paginated upstream calls

use crate::error::CheckError;
use crate::upstream::{ListKind, SocialGraphApi};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Concatenation of every page fetched for one list.
///
/// Items keep upstream order and are not deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregatedList {
    pub items: Vec<String>,
    pub total: usize,
    /// Pages successfully fetched
    pub pages: usize,
    /// True when a page after the first failed and the list was cut short
    pub partial: bool,
}

impl AggregatedList {
    fn push_page(&mut self, items: Vec<String>) {
        self.items.extend(items);
        self.total = self.items.len();
        self.pages += 1;
    }
}

pub struct ListFetcher {
    api: Arc<dyn SocialGraphApi>,
    page_size: usize,
    max_pages: usize,
}

impl ListFetcher {
    pub fn new(api: Arc<dyn SocialGraphApi>, page_size: usize, max_pages: usize) -> Self {
        Self {
            api,
            page_size,
            max_pages: max_pages.max(1),
        }
    }

    /// Page through one list until the cursor runs out or `max_pages` is hit.
    ///
    /// A failure on the first page is returned as is. A failure on any later
    /// page ends pagination and the pages gathered so far are returned with
    /// `partial` set.
    pub async fn fetch_all(
        &self,
        user_id: &str,
        kind: ListKind,
    ) -> Result<AggregatedList, CheckError> {
        let mut list = AggregatedList::default();
        let mut cursor: Option<String> = None;

        loop {
            let page = match self
                .api
                .list_page(user_id, kind, cursor.as_deref(), self.page_size)
                .await
            {
                Ok(page) => page,
                Err(e) if list.pages == 0 => {
                    warn!("First {} page for {} failed: {}", kind, user_id, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "{} page #{} for {} failed, keeping {} items from {} pages: {}",
                        kind,
                        list.pages + 1,
                        user_id,
                        list.total,
                        list.pages,
                        e
                    );
                    list.partial = true;
                    break;
                }
            };

            debug!(
                "Fetched {} page #{} for {}: {} items",
                kind,
                list.pages + 1,
                user_id,
                page.items.len()
            );
            list.push_page(page.items);

            match page.next_cursor {
                Some(next) if list.pages < self.max_pages => cursor = Some(next),
                Some(_) => {
                    info!(
                        "Reached page cap ({}) for {} of {}",
                        self.max_pages, kind, user_id
                    );
                    break;
                }
                None => break,
            }
        }

        info!(
            "Fetched {} {} for {} in {} pages{}",
            list.total,
            kind,
            user_id,
            list.pages,
            if list.partial { " (partial)" } else { "" }
        );

        Ok(list)
    }
}
