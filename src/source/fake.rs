//! Scripted in-memory source for unit tests

use crate::config::{Config, FieldSelector};
use crate::source::{ScrollTarget, SourceAdapter, SourceError, SourceResult, TargetPage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub(crate) const TIMESTAMP_QUERY: &str = "ts";
pub(crate) const RATING_QUERY: &str = "rating";
pub(crate) const ITEM_QUERY: &str = "item";

/// Configuration matching the scripted queries, with every pause disabled
pub(crate) fn fast_config() -> Config {
    let mut config = Config::default();
    config.source.item_query = ITEM_QUERY.to_string();
    config.source.timestamp = FieldSelector {
        query: TIMESTAMP_QUERY.to_string(),
        attribute: Some("content".to_string()),
    };
    config.source.rating = FieldSelector {
        query: RATING_QUERY.to_string(),
        attribute: None,
    };
    config.resolver.backoff_ms = 0;
    config.resolver.timeout_ms = 200;
    config.resolver.poll_interval_ms = 1;
    config.pager.pause_min_ms = 0;
    config.pager.pause_max_ms = 0;
    config.extractor.node_pause_ms = 0;
    config.extractor.settle_ms = 0;
    config.batch.delay_min_ms = 0;
    config.batch.delay_max_ms = 0;
    config
}

/// `count` items with distinct timestamps
pub(crate) fn items(count: usize) -> Vec<FakeItem> {
    (0..count)
        .map(|i| FakeItem::new(&format!("2024-05-{:02}T10:00:00", i + 1), "5"))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Timestamp,
    Rating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FakeNode {
    Header,
    Item(usize),
    Field(usize, Field),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeItem {
    pub timestamp: Option<String>,
    pub rating: Option<String>,
    pub stale: bool,
}

impl FakeItem {
    pub fn new(timestamp: &str, rating: &str) -> Self {
        Self {
            timestamp: Some(timestamp.to_string()),
            rating: Some(rating.to_string()),
            stale: false,
        }
    }
}

/// Scripted outcome of one `locate` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocateStep {
    Absent,
    Stale,
    Fatal,
    Found,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScrollLog {
    By(i64),
    IntoView(FakeNode),
}

#[derive(Debug, Default)]
struct Script {
    items: Vec<FakeItem>,
    revealed: usize,
    growth: usize,
    header_text: Option<String>,
    locate_plan: VecDeque<LocateStep>,
    locate_calls: u32,
    scrolls: Vec<ScrollLog>,
    opened: Vec<String>,
    fail_listing: bool,
    failing_targets: Vec<String>,
    closed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    script: Mutex<Script>,
}

impl FakeSource {
    /// `initial` items visible at open, `growth` more per scroll
    pub fn new(items: Vec<FakeItem>, initial: usize, growth: usize) -> Self {
        Self {
            script: Mutex::new(Script {
                items,
                revealed: initial,
                growth,
                ..Script::default()
            }),
        }
    }

    pub fn with_header(self, text: &str) -> Self {
        self.script.lock().unwrap().header_text = Some(text.to_string());
        self
    }

    pub fn with_locate_plan(self, plan: &[LocateStep]) -> Self {
        self.script.lock().unwrap().locate_plan = plan.iter().copied().collect();
        self
    }

    pub fn failing_listing(self) -> Self {
        self.script.lock().unwrap().fail_listing = true;
        self
    }

    /// Opening this target fails with a navigation error
    pub fn failing_target(self, id: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .failing_targets
            .push(id.to_string());
        self
    }

    pub fn locate_calls(&self) -> u32 {
        self.script.lock().unwrap().locate_calls
    }

    pub fn scrolls(&self) -> Vec<ScrollLog> {
        self.script.lock().unwrap().scrolls.clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.script.lock().unwrap().opened.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.script.lock().unwrap().closed
    }
}

#[async_trait]
impl SourceAdapter for FakeSource {
    type Node = FakeNode;

    async fn open(&self, page: &TargetPage) -> SourceResult<()> {
        let mut script = self.script.lock().unwrap();
        let id = page.entity_id.to_string();
        script.opened.push(id.clone());
        if script.failing_targets.contains(&id) {
            return Err(SourceError::Navigation(format!("{} unreachable", page.url)));
        }
        Ok(())
    }

    async fn locate(&self, query: &str) -> SourceResult<Option<FakeNode>> {
        let mut script = self.script.lock().unwrap();
        script.locate_calls += 1;
        match script.locate_plan.pop_front().unwrap_or(LocateStep::Found) {
            LocateStep::Absent => Ok(None),
            LocateStep::Stale => Err(SourceError::Stale(query.to_string())),
            LocateStep::Fatal => Err(SourceError::Driver("session crashed".to_string())),
            LocateStep::Found => Ok(Some(FakeNode::Header)),
        }
    }

    async fn locate_within(&self, node: &FakeNode, query: &str) -> SourceResult<Option<FakeNode>> {
        let script = self.script.lock().unwrap();
        let FakeNode::Item(index) = *node else {
            return Ok(None);
        };
        let item = &script.items[index];
        if item.stale {
            return Err(SourceError::Stale(format!("item {}", index)));
        }
        let found = match query {
            TIMESTAMP_QUERY => item.timestamp.is_some().then_some(Field::Timestamp),
            RATING_QUERY => item.rating.is_some().then_some(Field::Rating),
            _ => None,
        };
        Ok(found.map(|field| FakeNode::Field(index, field)))
    }

    async fn read_attribute(&self, node: &FakeNode, _name: &str) -> SourceResult<Option<String>> {
        let script = self.script.lock().unwrap();
        Ok(match *node {
            FakeNode::Field(index, Field::Timestamp) => script.items[index].timestamp.clone(),
            FakeNode::Field(index, Field::Rating) => script.items[index].rating.clone(),
            _ => None,
        })
    }

    async fn read_text(&self, node: &FakeNode) -> SourceResult<Option<String>> {
        let script = self.script.lock().unwrap();
        Ok(match *node {
            FakeNode::Header => script.header_text.clone(),
            FakeNode::Field(index, Field::Rating) => script.items[index].rating.clone(),
            FakeNode::Field(index, Field::Timestamp) => script.items[index].timestamp.clone(),
            FakeNode::Item(_) => None,
        })
    }

    async fn scroll(&self, target: ScrollTarget<'_, FakeNode>) -> SourceResult<()> {
        let mut script = self.script.lock().unwrap();
        let log = match target {
            ScrollTarget::By(offset) => ScrollLog::By(offset),
            ScrollTarget::IntoView(node) => ScrollLog::IntoView(*node),
        };
        // Lazy loading fires on viewport movement or when the last node comes into view
        let reveals = match log {
            ScrollLog::By(_) => true,
            ScrollLog::IntoView(FakeNode::Item(index)) => index + 1 >= script.revealed,
            ScrollLog::IntoView(_) => false,
        };
        if reveals {
            script.revealed = (script.revealed + script.growth).min(script.items.len());
        }
        script.scrolls.push(log);
        Ok(())
    }

    async fn revealed_nodes(&self, query: &str) -> SourceResult<Vec<FakeNode>> {
        let script = self.script.lock().unwrap();
        if script.fail_listing {
            return Err(SourceError::Driver("listing unavailable".to_string()));
        }
        if query != ITEM_QUERY {
            return Ok(Vec::new());
        }
        let visible = script.revealed.min(script.items.len());
        Ok((0..visible).map(FakeNode::Item).collect())
    }

    async fn close(&self) -> SourceResult<()> {
        self.script.lock().unwrap().closed = true;
        Ok(())
    }
}
