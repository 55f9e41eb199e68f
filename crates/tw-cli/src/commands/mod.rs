pub mod history;
pub mod play;
pub mod resume;
pub mod rewind;
pub mod roll;

use std::fs;
use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use tw_core::EventId;
use tw_runtime::{Instance, InstanceOptions, Snapshot};

use crate::story::{self, Story};

/// Merge an optional JSON options file with command-line overrides.
pub fn instance_options(
    seed: Option<&str>,
    max_steps: Option<usize>,
    file: Option<&Path>,
) -> Result<InstanceOptions, String> {
    let mut options = match file {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            let json: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| format!("invalid options file {}: {e}", path.display()))?;
            InstanceOptions::from_json(&json).map_err(|e| e.to_string())?
        }
        None => InstanceOptions::default(),
    };
    if let Some(seed) = seed {
        options = options.with_seed(seed);
    }
    if let Some(max_steps) = max_steps {
        options = options.with_max_steps(max_steps);
    }
    Ok(options)
}

/// Parse `e1100` or `1100`.
pub fn parse_event_id(s: &str) -> Result<EventId, String> {
    s.trim_start_matches('e')
        .parse::<u64>()
        .map(EventId)
        .map_err(|_| format!("invalid event id: {s}"))
}

/// Run `turns` nights of the story, recycling between them.
///
/// The instance keeps the history of the last turn played.
pub fn play_turns(
    story: &Story,
    mut instance: Instance,
    turns: u64,
    echo: bool,
) -> Result<Instance, String> {
    for _ in 0..turns {
        if !instance.history().is_empty() {
            instance = instance.recycle().map_err(|e| e.to_string())?;
        }
        let number = instance.cycle() + 1;
        let cast = story.bind(&instance).map_err(|e| e.to_string())?;
        let events = story::turn(cast, number).map_err(|e| e.to_string())?;

        let start = instance.output().len();
        let result = instance.invoke(events);
        if echo {
            for line in &instance.output().lines()[start..] {
                println!("  {}", line.text);
            }
            println!();
        }
        result.map_err(|e| format!("night {number} failed: {e}"))?;
    }
    Ok(instance)
}

/// Print every agent's effective properties.
pub fn print_state(instance: &Instance) -> Result<(), String> {
    println!("  {}", "Agents".bold().underline());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Agent", "Name", "Property", "Value"]);

    for id in instance.store().agents() {
        let handle = instance.agent(id).map_err(|e| e.to_string())?;
        let name = instance.store().name(id).unwrap_or("?").to_string();
        let properties = instance.properties(handle).map_err(|e| e.to_string())?;
        if properties.is_empty() {
            table.add_row(vec![id.to_string(), name, "—".to_string(), String::new()]);
            continue;
        }
        for (property, value) in properties {
            table.add_row(vec![id.to_string(), name.clone(), property, value.to_string()]);
        }
    }

    println!("{table}");
    println!();
    println!(
        "  night {} | {} random draws",
        instance.cycle() + 1,
        instance.random_state().num_generations
    );
    Ok(())
}

pub fn save_snapshot(instance: &Instance, path: &Path) -> Result<(), String> {
    let json = instance
        .snapshot()
        .to_json()
        .map_err(|e| e.to_string())?;
    fs::write(path, json).map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    println!("  Saved snapshot to {}", path.display());
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot, String> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Snapshot::from_json(&json).map_err(|e| e.to_string())
}
