//! Step a saved arena and report its displays.

use super::common::{format_levels, load_arena};
use clap::Args;
use gatework_config::{SimConfig, paths};
use gatework_core::{Arena, RecordKind, decode_seven_segment, evaluator, pretick, tick};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// Arena file, or the name of a saved circuit
    #[arg(value_name = "FILE")]
    file: String,

    /// Steps to run (defaults to the configured max_settle_rounds)
    #[arg(short, long)]
    steps: Option<u32>,

    /// Settings file (defaults to the user sim.toml, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop at the first step that reports no change
    #[arg(long)]
    until_settled: bool,

    /// Sleep between steps at the configured tick rate
    #[arg(long)]
    paced: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => paths::load_or_default()?,
    };
    let (path, mut arena) = load_arena(&args.file)?;
    let steps = args.steps.unwrap_or(config.max_settle_rounds);

    tracing::info!(
        "run {}: {} steps with '{}' settings",
        path.display(),
        steps,
        config.name
    );

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(u64::from(steps))
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} steps")?
            .progress_chars("##-"),
    );

    let mut force = config.force_first_step;
    let mut ran = 0;
    let mut settled = false;
    for _ in 0..steps {
        let changed = pretick(&mut arena, force);
        tick(&mut arena, force);
        force = false;
        ran += 1;
        pb.inc(1);

        if !changed {
            settled = true;
            if args.until_settled {
                break;
            }
        } else {
            settled = false;
        }
        if args.paced {
            std::thread::sleep(config.tick_interval());
        }
    }
    pb.finish_and_clear();

    println!(
        "Ran {ran} step(s): {}",
        if settled { "settled" } else { "still changing" }
    );
    print_displays(&arena);
    Ok(())
}

fn print_displays(arena: &Arena) {
    let displays = arena
        .records()
        .filter(|r| r.depth == 1 && r.kind.is_output());
    for record in displays {
        let Some(levels) = evaluator::display_levels(arena, record.offset) else {
            continue;
        };
        let mut line = format!(
            "  {} {:20} {}",
            record.offset,
            record.kind.name(),
            format_levels(&levels)
        );
        if record.kind == RecordKind::SevenSegmentDisplay {
            match decode_seven_segment(&levels) {
                Some(digit) => line.push_str(&format!("  ({digit:X})")),
                None => line.push_str("  (?)"),
            }
        }
        println!("{line}");
    }
}
