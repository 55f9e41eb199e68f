use std::path::Path;

use colored::Colorize;
use tw_runtime::{Instance, InstanceOptions};

use crate::story::Story;

pub fn run(options: InstanceOptions, turns: u64, save: Option<&Path>) -> Result<(), String> {
    let story = Story::new()?;
    println!(
        "  {} '{}' {}",
        "Playing".bold(),
        options.name(),
        format!("({turns} nights, seed={})", options.seed()).dimmed()
    );
    println!();

    let instance =
        Instance::new(story.registry(), options).map_err(|e| format!("failed to start: {e}"))?;
    let instance = super::play_turns(&story, instance, turns, true)?;
    super::print_state(&instance)?;

    if let Some(path) = save {
        super::save_snapshot(&instance, path)?;
    }
    Ok(())
}
