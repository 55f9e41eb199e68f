//! CLI playground for the Talewright runtime.

mod commands;
mod story;

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tw_core::EventId;

#[derive(Parser)]
#[command(
    name = "tw",
    about = "Talewright: play, rewind and resume a sample turn-based story",
    version,
    propagate_version = true
)]
struct Cli {
    /// Maximum log level written to stderr (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InstanceArgs {
    /// Random seed (overrides the options file)
    #[arg(short, long)]
    seed: Option<String>,

    /// Step limit per night, 0 disables it (overrides the options file)
    #[arg(long)]
    max_steps: Option<usize>,

    /// JSON file with instance options
    #[arg(long)]
    options: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play nights of the sample story
    Play {
        /// Number of nights to play
        #[arg(short, long, default_value = "3")]
        turns: u64,

        /// Write a snapshot after the last night
        #[arg(long)]
        save: Option<PathBuf>,

        #[command(flatten)]
        instance: InstanceArgs,
    },

    /// Show the event records of the last night played
    History {
        /// Number of nights to play first
        #[arg(short, long, default_value = "1")]
        turns: u64,

        #[command(flatten)]
        instance: InstanceArgs,
    },

    /// Play, then revert to an event of the last night
    Rewind {
        /// Event to revert to (e.g. e1030 or 1030)
        #[arg(long, value_parser = commands::parse_event_id)]
        to: EventId,

        /// Number of nights to play first
        #[arg(short, long, default_value = "1")]
        turns: u64,

        #[command(flatten)]
        instance: InstanceArgs,
    },

    /// Continue play from a snapshot file
    Resume {
        /// Snapshot written by `play --save`
        #[arg(long)]
        from: PathBuf,

        /// Number of further nights
        #[arg(short, long, default_value = "1")]
        turns: u64,

        /// Write a snapshot after the last night
        #[arg(long)]
        save: Option<PathBuf>,

        #[command(flatten)]
        instance: InstanceArgs,
    },

    /// Draw seeded integers, optionally replaying from a generation
    Roll {
        /// Random seed
        #[arg(short, long, default_value = "talewright")]
        seed: String,

        /// Number of draws
        #[arg(short, long, default_value = "5")]
        count: u64,

        /// Fast-forward past this many draws first
        #[arg(long, default_value = "0")]
        from: u64,

        /// Smallest value
        #[arg(long, default_value = "1")]
        min: i64,

        /// Largest value
        #[arg(long, default_value = "6")]
        max: i64,
    },
}

impl InstanceArgs {
    fn resolve(&self) -> Result<tw_runtime::InstanceOptions, String> {
        commands::instance_options(
            self.seed.as_deref(),
            self.max_steps,
            self.options.as_deref(),
        )
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Play {
            turns,
            save,
            instance,
        } => instance
            .resolve()
            .and_then(|options| commands::play::run(options, turns, save.as_deref())),
        Commands::History { turns, instance } => instance
            .resolve()
            .and_then(|options| commands::history::run(options, turns)),
        Commands::Rewind {
            to,
            turns,
            instance,
        } => instance
            .resolve()
            .and_then(|options| commands::rewind::run(options, turns, to)),
        Commands::Resume {
            from,
            turns,
            save,
            instance,
        } => instance.resolve().and_then(|options| {
            commands::resume::run(options, &from, turns, save.as_deref())
        }),
        Commands::Roll {
            seed,
            count,
            from,
            min,
            max,
        } => commands::roll::run(&seed, count, from, min, max),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
