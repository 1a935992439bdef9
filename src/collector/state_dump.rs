//! Dump of the page's embedded state document
//!
//! Target pages embed their application state as JSON inside a script node.
//! Dumping it is a debugging aid for adjusting queries when the page layout
//! changes.

use crate::collector::Harvester;
use crate::source::{SourceAdapter, SourceError};
use crate::storage::{atomic_write, EntityId, StorageError};
use crate::Result;
use std::path::Path;

/// Resolves the state node of `entity_id` and writes it as pretty JSON
///
/// # Returns
///
/// The decoded document, after it has been written to `output`
pub async fn dump_state<S>(
    harvester: &Harvester,
    source: &S,
    entity_id: &EntityId,
    output: &Path,
) -> Result<serde_json::Value>
where
    S: SourceAdapter + ?Sized,
{
    let query = &harvester.source_config().state_query;
    harvester.open_target(source, entity_id).await?;

    let node = harvester.resolver().resolve(source, query).await?;
    let text = source
        .read_text(&node)
        .await?
        .ok_or_else(|| SourceError::NotFound(format!("{} (empty)", query)))?;

    let state: serde_json::Value = serde_json::from_str(&text)?;
    let pretty = serde_json::to_string_pretty(&state).map_err(StorageError::Encode)?;
    atomic_write(output, format!("{pretty}\n").as_bytes()).map_err(|source| {
        StorageError::Write {
            path: output.to_path_buf(),
            source,
        }
    })?;

    tracing::info!("Wrote state of {} to {}", entity_id, output.display());
    Ok(state)
}
