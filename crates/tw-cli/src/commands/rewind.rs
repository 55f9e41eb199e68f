use colored::Colorize;
use tw_core::EventId;
use tw_runtime::{Instance, InstanceOptions};

use crate::story::Story;

pub fn run(options: InstanceOptions, turns: u64, to: EventId) -> Result<(), String> {
    let story = Story::new()?;
    let instance =
        Instance::new(story.registry(), options).map_err(|e| format!("failed to start: {e}"))?;
    let mut instance = super::play_turns(&story, instance, turns, false)?;

    let name = instance
        .record(to)
        .map(|r| r.name.clone())
        .unwrap_or_default();
    let summary = instance.revert(to).map_err(|e| e.to_string())?;

    println!(
        "  {} to {} '{}'",
        "Reverted".bold(),
        summary.target,
        name
    );
    println!(
        "  {} events, {} changes and {} lines undone; random rewound to draw {}",
        summary.records, summary.changes, summary.lines, summary.generation
    );
    println!();
    super::print_state(&instance)
}
