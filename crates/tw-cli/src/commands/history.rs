use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use tw_runtime::{Instance, InstanceOptions};

use crate::story::Story;

pub fn run(options: InstanceOptions, turns: u64) -> Result<(), String> {
    let story = Story::new()?;
    let instance =
        Instance::new(story.registry(), options).map_err(|e| format!("failed to start: {e}"))?;
    let instance = super::play_turns(&story, instance, turns, false)?;

    println!(
        "  {} night {}",
        "History of".bold().underline(),
        instance.cycle() + 1
    );
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Event", "Name", "Cause", "Changes", "Draws", "Lines"]);

    let root = instance.root();
    for record in instance.history().iter() {
        let cause = record.caused_by.unwrap_or(root);
        let name = if record.failed {
            format!("{} (failed)", record.name)
        } else {
            record.name.clone()
        };
        table.add_row(vec![
            record.id.to_string(),
            name,
            cause.to_string(),
            record.changes.len().to_string(),
            record.draws.len().to_string(),
            record.lines.len().to_string(),
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} events", instance.history().len());
    Ok(())
}
