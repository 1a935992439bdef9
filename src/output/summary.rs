//! Batch summary reporting

use crate::batch::BatchSummary;
use crate::state::TargetState;

/// Prints the per-target outcome table of a batch to stdout
pub fn print_batch_summary(summary: &BatchSummary) {
    println!("=== Batch Summary ===\n");

    for outcome in &summary.outcomes {
        let detail = match (outcome.state, &outcome.error, outcome.end) {
            (TargetState::Failed, Some(error), _) => error.clone(),
            (TargetState::Skipped, _, _) => "already in store".to_string(),
            (_, _, Some(end)) => format!(
                "{} collected, {} new ({})",
                outcome.collected, outcome.persisted, end
            ),
            _ => String::new(),
        };
        println!("  {:<20} {:<10} {}", outcome.entity_id, outcome.state, detail);
    }
    println!();

    println!(
        "Targets: {} completed, {} failed, {} skipped",
        summary.completed(),
        summary.failed(),
        summary.skipped()
    );
    println!(
        "New records: {} in {:.1}s",
        summary.total_persisted(),
        summary.elapsed.as_secs_f64()
    );
}
