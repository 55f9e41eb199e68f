use std::path::Path;

use colored::Colorize;
use tw_runtime::{Instance, InstanceOptions, Transcript};

use crate::story::Story;

pub fn run(
    options: InstanceOptions,
    from: &Path,
    turns: u64,
    save: Option<&Path>,
) -> Result<(), String> {
    let story = Story::new()?;
    let snapshot = super::load_snapshot(from)?;
    println!(
        "  {} '{}' {}",
        "Resuming".bold(),
        snapshot.name,
        format!(
            "(after night {}, taken {})",
            snapshot.cycle + 1,
            snapshot.taken_at.format("%Y-%m-%d %H:%M:%S")
        )
        .dimmed()
    );
    println!();

    let instance = Instance::restore(story.registry(), options, snapshot, Transcript::new())
        .map_err(|e| format!("failed to restore: {e}"))?;
    let instance = super::play_turns(&story, instance, turns, true)?;
    super::print_state(&instance)?;

    if let Some(path) = save {
        super::save_snapshot(&instance, path)?;
    }
    Ok(())
}
