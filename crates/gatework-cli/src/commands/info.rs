//! Display arena statistics.

use super::common::{format_bytes, load_arena};
use clap::Args;
use std::collections::BTreeMap;

/// Display arena information.
#[derive(Args)]
pub struct InfoArgs {
    /// Arena file, or the name of a saved circuit
    #[arg(value_name = "FILE")]
    pub file: String,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let (path, arena) = load_arena(&args.file)?;

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut root_children = 0;
    let mut max_depth = 0;
    for record in arena.records().skip(1) {
        *counts.entry(record.kind.name()).or_default() += 1;
        if record.depth == 1 {
            root_children += 1;
        }
        max_depth = max_depth.max(record.depth);
    }

    println!("File:          {}", path.display());
    println!("Arena Size:    {}", format_bytes(u64::from(arena.len())));
    println!("Root Kind:     {}", arena.kind(gatework_core::Offset::ROOT).name());
    println!("Root Children: {root_children}");
    println!("Nesting Depth: {}", max_depth.saturating_sub(1));
    println!("Records:");
    for (kind, count) in &counts {
        println!("  {kind:20} {count}");
    }
    Ok(())
}
