//! Flash notices
//!
//! Notices need a login session to attach to. Anonymous requests never
//! reach a flash-producing action, so pushes without a session are dropped.

use crate::db::repositories::FlashRepository;
use crate::models::Flash;
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct FlashService {
    repo: Arc<dyn FlashRepository>,
}

impl FlashService {
    pub fn new(repo: Arc<dyn FlashRepository>) -> Self {
        Self { repo }
    }

    /// Queue a notice for the session's next page
    pub async fn push(&self, session_id: Option<&str>, flash: Flash) -> Result<()> {
        let Some(session_id) = session_id else {
            tracing::debug!(message = %flash.message, "Dropping flash without a session");
            return Ok(());
        };
        self.repo
            .push(session_id, &flash)
            .await
            .context("Failed to queue flash notice")
    }

    /// Take every pending notice for the session
    pub async fn take(&self, session_id: Option<&str>) -> Result<Vec<Flash>> {
        match session_id {
            Some(id) => self.repo.take(id).await.context("Failed to read flash notices"),
            None => Ok(Vec::new()),
        }
    }
}
