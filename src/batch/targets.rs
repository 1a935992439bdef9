//! Batch target lists
//!
//! A target file holds one identifier per line. Blank lines and lines
//! starting with `#` are ignored; malformed lines are logged and skipped.

use crate::storage::EntityId;
use crate::Result;
use std::collections::HashSet;
use std::path::Path;

/// Parses a line-oriented target list
pub fn parse_target_list(content: &str) -> Vec<EntityId> {
    let mut targets = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match EntityId::new(line) {
            Ok(id) => targets.push(id),
            Err(e) => tracing::warn!("Skipping target list line {}: {}", index + 1, e),
        }
    }

    targets
}

/// Reads and parses a target list file
pub fn read_target_file(path: &Path) -> Result<Vec<EntityId>> {
    let content = std::fs::read_to_string(path)?;
    let targets = parse_target_list(&content);
    tracing::info!("Loaded {} targets from {}", targets.len(), path.display());
    Ok(targets)
}

/// Drops repeated identifiers, keeping the first occurrence of each
pub fn dedup_targets(targets: Vec<EntityId>) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
