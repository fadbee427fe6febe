//! Shared CLI helpers used across multiple commands.

use gatework_config::{ConfigError, paths};
use gatework_core::Arena;
use std::path::PathBuf;

/// Resolve a circuit argument to a file.
///
/// Accepts a path to an existing file, or the name of a circuit saved in the
/// user circuits directory (with or without the `.arena` extension).
pub fn resolve_circuit(name: &str) -> anyhow::Result<PathBuf> {
    paths::find_circuit(name).ok_or_else(|| {
        tracing::debug!("searched {}", paths::user_circuits_dir().display());
        ConfigError::CircuitNotFound(name.to_string()).into()
    })
}

/// Resolve and load a validated arena.
pub fn load_arena(name: &str) -> anyhow::Result<(PathBuf, Arena)> {
    let path = resolve_circuit(name)?;
    let arena = Arena::load_from_file(&path)
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
    tracing::debug!("loaded {} ({} bytes)", path.display(), arena.len());
    Ok((path, arena))
}

/// Render a level list as `0`/`1` characters.
pub fn format_levels(levels: &[bool]) -> String {
    levels.iter().map(|&l| if l { '1' } else { '0' }).collect()
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
