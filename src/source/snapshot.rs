//! Offline replay of saved HTML pages
//!
//! A snapshot holds the fully rendered page. Progressive revelation is
//! modelled by exposing only the first `page_size` matches of a node listing
//! and one more page whenever the viewport moves or the listing's last node
//! is scrolled into view, which is enough to exercise the collector end to
//! end without a browser.
//!
//! Node handles are element ordinals in document order. The document is
//! re-parsed per call because parsed trees are not thread-safe.

use crate::source::{ScrollTarget, SourceAdapter, SourceError, SourceResult, TargetPage};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Handle to an element of the currently open snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotNode {
    ordinal: usize,
}

#[derive(Debug, Clone)]
enum Documents {
    /// The same page for every target
    Single(Arc<str>),
    /// `<dir>/<entity id>.html` per target
    Directory(PathBuf),
}

#[derive(Debug, Default)]
struct View {
    html: Option<Arc<str>>,
    revealed_pages: usize,
    scrolls: usize,
    /// Last node of the most recent listing
    tail: Option<SnapshotNode>,
}

/// Source adapter replaying HTML snapshots
#[derive(Debug)]
pub struct SnapshotSource {
    documents: Documents,
    page_size: usize,
    view: Mutex<View>,
}

impl SnapshotSource {
    /// Replays one HTML document for every target
    pub fn from_html(html: impl Into<String>, page_size: usize) -> Self {
        Self::with_documents(Documents::Single(Arc::from(html.into())), page_size)
    }

    /// Replays `<dir>/<entity id>.html` for each target
    pub fn from_dir(dir: impl Into<PathBuf>, page_size: usize) -> Self {
        Self::with_documents(Documents::Directory(dir.into()), page_size)
    }

    fn with_documents(documents: Documents, page_size: usize) -> Self {
        Self {
            documents,
            page_size: page_size.max(1),
            view: Mutex::new(View::default()),
        }
    }

    /// Number of scrolls performed since the last `open`
    pub fn scroll_count(&self) -> usize {
        self.view.lock().map(|v| v.scrolls).unwrap_or(0)
    }

    fn lock_view(&self) -> SourceResult<std::sync::MutexGuard<'_, View>> {
        self.view
            .lock()
            .map_err(|_| SourceError::Driver("snapshot view lock poisoned".to_string()))
    }

    /// Parses the open document and hands it to `f` with the reveal limit
    fn with_document<T>(&self, f: impl FnOnce(&Html, usize) -> SourceResult<T>) -> SourceResult<T> {
        let (html, revealed) = {
            let view = self.lock_view()?;
            let html = view
                .html
                .clone()
                .ok_or_else(|| SourceError::Navigation("no snapshot page is open".to_string()))?;
            (html, view.revealed_pages.saturating_mul(self.page_size))
        };

        let document = Html::parse_document(&html);
        f(&document, revealed)
    }
}

fn parse_selector(query: &str) -> SourceResult<Selector> {
    Selector::parse(query).map_err(|e| SourceError::InvalidQuery {
        query: query.to_string(),
        message: format!("{:?}", e),
    })
}

fn elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
}

fn element_at(document: &Html, node: SnapshotNode) -> SourceResult<ElementRef<'_>> {
    elements(document)
        .nth(node.ordinal)
        .ok_or_else(|| SourceError::Stale(format!("element #{} is gone", node.ordinal)))
}

fn ordinal_of(document: &Html, element: ElementRef<'_>) -> Option<SnapshotNode> {
    elements(document)
        .position(|e| e.id() == element.id())
        .map(|ordinal| SnapshotNode { ordinal })
}

#[async_trait]
impl SourceAdapter for SnapshotSource {
    type Node = SnapshotNode;

    async fn open(&self, page: &TargetPage) -> SourceResult<()> {
        let html: Arc<str> = match &self.documents {
            Documents::Single(html) => Arc::clone(html),
            Documents::Directory(dir) => {
                let path = dir.join(format!("{}.html", page.entity_id));
                let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    SourceError::Navigation(format!("{} ({}): {}", page.url, path.display(), e))
                })?;
                Arc::from(content)
            }
        };

        let mut view = self.lock_view()?;
        view.html = Some(html);
        view.revealed_pages = 1;
        view.scrolls = 0;
        view.tail = None;
        tracing::debug!("Opened snapshot for {}", page.url);
        Ok(())
    }

    async fn locate(&self, query: &str) -> SourceResult<Option<SnapshotNode>> {
        let selector = parse_selector(query)?;
        self.with_document(|document, _| {
            Ok(document
                .select(&selector)
                .next()
                .and_then(|element| ordinal_of(document, element)))
        })
    }

    async fn locate_within(
        &self,
        node: &SnapshotNode,
        query: &str,
    ) -> SourceResult<Option<SnapshotNode>> {
        let selector = parse_selector(query)?;
        let node = *node;
        self.with_document(|document, _| {
            let parent = element_at(document, node)?;
            Ok(parent
                .select(&selector)
                .next()
                .and_then(|element| ordinal_of(document, element)))
        })
    }

    async fn read_attribute(&self, node: &SnapshotNode, name: &str) -> SourceResult<Option<String>> {
        let node = *node;
        self.with_document(|document, _| {
            let element = element_at(document, node)?;
            Ok(element.value().attr(name).map(str::to_string))
        })
    }

    async fn read_text(&self, node: &SnapshotNode) -> SourceResult<Option<String>> {
        let node = *node;
        self.with_document(|document, _| {
            let element = element_at(document, node)?;
            let text = element.text().collect::<String>();
            let text = text.trim();
            Ok((!text.is_empty()).then(|| text.to_string()))
        })
    }

    async fn scroll(&self, target: ScrollTarget<'_, SnapshotNode>) -> SourceResult<()> {
        let mut view = self.lock_view()?;
        if view.html.is_none() {
            return Err(SourceError::Navigation("no snapshot page is open".to_string()));
        }
        // Viewport movement, or bringing the listing's tail into view, loads the next page
        let reveals = match target {
            ScrollTarget::By(_) => true,
            ScrollTarget::IntoView(node) => view.tail == Some(*node),
        };
        if reveals {
            view.revealed_pages += 1;
        }
        view.scrolls += 1;
        tracing::trace!("Snapshot scroll {:?}, {} pages revealed", target, view.revealed_pages);
        Ok(())
    }

    async fn revealed_nodes(&self, query: &str) -> SourceResult<Vec<SnapshotNode>> {
        let selector = parse_selector(query)?;
        let nodes: Vec<SnapshotNode> = self.with_document(|document, revealed| {
            let ordinals: HashMap<_, usize> = elements(document)
                .enumerate()
                .map(|(ordinal, element)| (element.id(), ordinal))
                .collect();

            Ok(document
                .select(&selector)
                .take(revealed)
                .filter_map(|element| ordinals.get(&element.id()))
                .map(|&ordinal| SnapshotNode { ordinal })
                .collect())
        })?;

        self.lock_view()?.tail = nodes.last().copied();
        Ok(nodes)
    }
}
