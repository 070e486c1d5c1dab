use crate::error::CheckError;
use crate::handle::Handle;
use crate::upstream::{ListKind, ListPage, Profile, SocialGraphApi};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// In-memory upstream that replays a fixed sequence of page results.
pub struct ScriptedApi {
    profile: Result<Profile, CheckError>,
    pages: Mutex<VecDeque<Result<ListPage, CheckError>>>,
    /// Cursor passed on every list call, in order
    pub cursors: Mutex<Vec<Option<String>>>,
}

impl ScriptedApi {
    pub fn new(pages: Vec<Result<ListPage, CheckError>>) -> Self {
        Self {
            profile: Ok(test_profile("1001", false)),
            pages: Mutex::new(pages.into()),
            cursors: Mutex::new(Vec::new()),
        }
    }

    pub fn with_profile(mut self, profile: Result<Profile, CheckError>) -> Self {
        self.profile = profile;
        self
    }

    pub fn calls(&self) -> usize {
        self.cursors.lock().len()
    }
}

#[async_trait]
impl SocialGraphApi for ScriptedApi {
    async fn profile(&self, _handle: &Handle) -> Result<Profile, CheckError> {
        self.profile.clone()
    }

    async fn list_page(
        &self,
        _user_id: &str,
        _kind: ListKind,
        cursor: Option<&str>,
        _page_size: usize,
    ) -> Result<ListPage, CheckError> {
        self.cursors.lock().push(cursor.map(str::to_string));
        self.pages
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ListPage::default()))
    }
}

pub fn test_profile(id: &str, is_private: bool) -> Profile {
    Profile {
        id: id.to_string(),
        username: "subject".to_string(),
        full_name: "Test Subject".to_string(),
        is_private,
        follower_count: Some(3),
        following_count: Some(2),
    }
}

/// A page of `names` pointing at `next`.
pub fn page(names: &[&str], next: Option<&str>) -> Result<ListPage, CheckError> {
    Ok(ListPage {
        items: names.iter().map(|n| n.to_string()).collect(),
        next_cursor: next.map(str::to_string),
    })
}

/// A page whose names are `{prefix}{n}` for n in `range`, always with a cursor.
pub fn numbered_page(prefix: &str, range: std::ops::Range<usize>) -> Result<ListPage, CheckError> {
    let cursor = format!("cursor-{}", range.end);
    Ok(ListPage {
        items: range.map(|n| format!("{prefix}{n}")).collect(),
        next_cursor: Some(cursor),
    })
}
