//! Content source adapters
//!
//! The collector never talks to a browser directly. It depends only on the
//! [`SourceAdapter`] capability set: open a target page, locate nodes by a
//! query, read node attributes or text, scroll, and list the nodes revealed
//! so far. Two adapters ship with the crate:
//!
//! - [`SnapshotSource`]: replays saved HTML offline, revealing one page of
//!   nodes per scroll
//! - `ChromiumSource` (feature `chromium`): drives a live headless browser

#[cfg(feature = "chromium")]
mod chromium;
#[cfg(test)]
pub(crate) mod fake;
mod snapshot;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumSource;
pub use snapshot::{SnapshotNode, SnapshotSource};

use crate::storage::EntityId;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use thiserror::Error;
use url::Url;

/// Errors reported by a source adapter
#[derive(Debug, Error)]
pub enum SourceError {
    /// The queried element is not (yet) present
    #[error("element not found: {0}")]
    NotFound(String),

    /// A node handle went stale between lookup and use
    #[error("stale element reference: {0}")]
    Stale(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("invalid query {query:?}: {message}")]
    InvalidQuery { query: String, message: String },

    #[error("driver error: {0}")]
    Driver(String),

    /// The underlying session is gone; nothing further can succeed
    #[error("source session closed")]
    Closed,
}

impl SourceError {
    /// Whether the condition may clear up once rendering catches up
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Stale(_))
    }
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// The page of one harvest target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPage {
    pub entity_id: EntityId,
    pub url: Url,
}

/// What a scroll should move to
#[derive(Debug)]
pub enum ScrollTarget<'a, N> {
    /// Scroll the viewport by a pixel offset
    By(i64),
    /// Bring a node into view
    IntoView(&'a N),
}

/// Capability set the collector needs from a content source
///
/// A source is one exclusive stateful viewport; callers drive it
/// sequentially and never issue concurrent calls.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Handle to a located node
    type Node: Clone + fmt::Debug + Send + Sync;

    /// Navigates to a target page
    async fn open(&self, page: &TargetPage) -> SourceResult<()>;

    /// Finds the first node matching `query`, if it is present right now
    async fn locate(&self, query: &str) -> SourceResult<Option<Self::Node>>;

    /// Finds the first descendant of `node` matching `query`
    async fn locate_within(&self, node: &Self::Node, query: &str)
        -> SourceResult<Option<Self::Node>>;

    /// Reads an attribute of a node
    async fn read_attribute(&self, node: &Self::Node, name: &str) -> SourceResult<Option<String>>;

    /// Reads the text content of a node
    async fn read_text(&self, node: &Self::Node) -> SourceResult<Option<String>>;

    /// Scrolls the viewport
    async fn scroll(&self, target: ScrollTarget<'_, Self::Node>) -> SourceResult<()>;

    /// All nodes matching `query` that are revealed so far, in reveal order
    async fn revealed_nodes(&self, query: &str) -> SourceResult<Vec<Self::Node>>;

    /// Releases the session; nothing may be called afterwards
    async fn close(&self) -> SourceResult<()> {
        Ok(())
    }
}

/// Awaits `work`, then closes `source` whether or not the work failed
pub async fn run_then_close<S, F, T, E>(source: &S, work: F) -> Result<T, E>
where
    S: SourceAdapter + ?Sized,
    F: Future<Output = Result<T, E>>,
{
    let result = work.await;
    if let Err(e) = source.close().await {
        tracing::warn!("Closing the source failed: {}", e);
    }
    result
}
