//! Print the structure of a saved arena.

use super::common::load_arena;
use clap::Args;

#[derive(Args)]
pub struct DumpArgs {
    /// Arena file, or the name of a saved circuit
    #[arg(value_name = "FILE")]
    file: String,
}

pub fn run(args: DumpArgs) -> anyhow::Result<()> {
    let (_, arena) = load_arena(&args.file)?;
    print!("{}", arena.dump());
    Ok(())
}
