//! View handle.

use std::sync::Arc;

use arango_core::Result;

use super::entity::ViewEntity;
use super::request;
use crate::executor::{decode, Executor};

#[derive(Debug, Clone)]
pub struct View {
    database: String,
    name: String,
    executor: Arc<Executor>,
}

impl View {
    pub(crate) fn new(
        executor: Arc<Executor>,
        database: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn info(&self) -> Result<ViewEntity> {
        self.executor
            .execute(
                request::view_info_request(&self.database, &self.name),
                decode::body(),
                None,
            )
            .await
    }

    pub async fn drop(&self) -> Result<()> {
        self.executor
            .execute(
                request::drop_view_request(&self.database, &self.name),
                decode::unit(),
                None,
            )
            .await
    }

    /// Renames the view. The handle keeps its old name.
    pub async fn rename(&self, new_name: &str) -> Result<ViewEntity> {
        self.executor
            .execute(
                request::rename_view_request(&self.database, &self.name, new_name),
                decode::body(),
                None,
            )
            .await
    }
}
