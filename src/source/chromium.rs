//! Live browser source backed by a headless Chromium
//!
//! Queries are CSS selectors. Node handles are remote element references,
//! which the browser invalidates whenever the page re-renders the element;
//! those failures surface as [`SourceError::Stale`].

use crate::config::BrowserConfig;
use crate::source::{ScrollTarget, SourceAdapter, SourceError, SourceResult, TargetPage};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Element, Page};
use futures_util::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Remote element handle
pub type ChromiumNode = Arc<Element>;

/// Source adapter driving one Chromium tab
pub struct ChromiumSource {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSource {
    /// Launches the browser and opens a blank tab
    pub async fn launch(config: &BrowserConfig) -> SourceResult<Self> {
        let mut builder = LaunchConfig::builder().no_sandbox();
        if !config.headless {
            builder = builder.with_head();
        }
        let launch = builder.build().map_err(SourceError::Driver)?;

        let (browser, mut handler) = Browser::launch(launch).await.map_err(map_cdp_error)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(map_cdp_error)?;
        tracing::info!(headless = config.headless, "Browser launched");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }
}

/// Classifies protocol errors; detached-node failures are transient
fn map_cdp_error(error: CdpError) -> SourceError {
    let message = error.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("no node with given id")
        || lowered.contains("could not find node")
        || lowered.contains("node is detached")
        || lowered.contains("cannot find context with specified id")
    {
        SourceError::Stale(message)
    } else if lowered.contains("channel closed") || lowered.contains("connection closed") {
        SourceError::Closed
    } else {
        SourceError::Driver(message)
    }
}

#[async_trait]
impl SourceAdapter for ChromiumSource {
    type Node = ChromiumNode;

    async fn open(&self, page: &TargetPage) -> SourceResult<()> {
        self.page
            .goto(page.url.as_str())
            .await
            .map_err(|e| SourceError::Navigation(format!("{}: {}", page.url, e)))?;
        tracing::debug!("Navigated to {}", page.url);
        Ok(())
    }

    async fn locate(&self, query: &str) -> SourceResult<Option<ChromiumNode>> {
        let mut found = self.page.find_elements(query).await.map_err(map_cdp_error)?;
        Ok((!found.is_empty()).then(|| Arc::new(found.swap_remove(0))))
    }

    async fn locate_within(
        &self,
        node: &ChromiumNode,
        query: &str,
    ) -> SourceResult<Option<ChromiumNode>> {
        let mut found = node.find_elements(query).await.map_err(map_cdp_error)?;
        Ok((!found.is_empty()).then(|| Arc::new(found.swap_remove(0))))
    }

    async fn read_attribute(&self, node: &ChromiumNode, name: &str) -> SourceResult<Option<String>> {
        node.attribute(name).await.map_err(map_cdp_error)
    }

    async fn read_text(&self, node: &ChromiumNode) -> SourceResult<Option<String>> {
        let text = node.inner_text().await.map_err(map_cdp_error)?;
        Ok(text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    async fn scroll(&self, target: ScrollTarget<'_, ChromiumNode>) -> SourceResult<()> {
        match target {
            ScrollTarget::By(offset) => {
                self.page
                    .evaluate(format!("window.scrollBy(0, {});", offset))
                    .await
                    .map_err(map_cdp_error)?;
            }
            ScrollTarget::IntoView(node) => {
                node.scroll_into_view().await.map_err(map_cdp_error)?;
            }
        }
        Ok(())
    }

    async fn revealed_nodes(&self, query: &str) -> SourceResult<Vec<ChromiumNode>> {
        let nodes = self.page.find_elements(query).await.map_err(map_cdp_error)?;
        Ok(nodes.into_iter().map(Arc::new).collect())
    }

    /// Closes the browser and waits for its event loop to stop
    async fn close(&self) -> SourceResult<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(map_cdp_error)?;
        let _ = browser.wait().await;
        self.handler.abort();
        tracing::info!("Browser closed");
        Ok(())
    }
}
