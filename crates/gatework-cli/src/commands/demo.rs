//! Build a demo circuit and save its compiled arena.

use crate::demos::{available_demos, find_demo};
use clap::Args;
use gatework_config::paths;
use gatework_core::compile;
use std::path::PathBuf;

#[derive(Args)]
pub struct DemoArgs {
    /// Demo name (omit to list demos)
    #[arg(value_name = "NAME")]
    name: Option<String>,

    /// Output arena file (defaults to the user circuits directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: DemoArgs) -> anyhow::Result<()> {
    let Some(name) = args.name else {
        println!("Available demos:");
        println!();
        for demo in available_demos() {
            println!("  {:12}  {}", demo.name, demo.description);
        }
        return Ok(());
    };

    let demo = find_demo(&name).ok_or_else(|| {
        anyhow::anyhow!("Unknown demo: {} (run 'gatework demo' to list them)", name)
    })?;
    let circuit = (demo.build)()?;
    let compiled = compile(&circuit);

    let output = match args.output {
        Some(path) => path,
        None => paths::ensure_user_circuits_dir()?
            .join(format!("{}.{}", demo.name, paths::ARENA_EXTENSION)),
    };
    compiled.arena.save_to_file(&output)?;

    tracing::info!(
        "demo {}: {} nodes, {} bytes",
        demo.name,
        circuit.node_count(),
        compiled.arena.len()
    );
    println!("Saved {} to {}", demo.name, output.display());
    match u32::try_from(compiled.delay) {
        Ok(delay) => println!("  settles in {delay} step(s)"),
        Err(_) => println!("  cyclic: may never settle"),
    }
    Ok(())
}
