//! Platform-specific paths for settings and saved circuits.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/gatework/` (Linux), `~/Library/Application Support/gatework/` (macOS), `%APPDATA%\gatework\` (Windows)
//! - **Default settings file**: `<user config>/sim.toml`
//! - **Saved circuits**: `<user config>/circuits/*.arena`
//!
//! # Example
//!
//! ```rust,no_run
//! use gatework_config::paths;
//!
//! let config = paths::load_or_default().unwrap();
//! println!("tick rate: {} Hz", config.tick_rate_hz);
//!
//! if let Some(path) = paths::find_circuit("half_adder") {
//!     println!("Found: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::{ConfigError, SimConfig};

/// Application name used for directory paths.
const APP_NAME: &str = "gatework";

/// Subdirectory name for saved circuits.
const CIRCUITS_SUBDIR: &str = "circuits";

/// File name of the default settings file.
const CONFIG_FILE: &str = "sim.toml";

/// Extension of raw arena files.
pub const ARENA_EXTENSION: &str = "arena";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the path of the default settings file.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// Returns the user-specific directory of saved circuits.
pub fn user_circuits_dir() -> PathBuf {
    user_config_dir().join(CIRCUITS_SUBDIR)
}

/// Loads the default settings file, or the built-in defaults if it does not
/// exist. A file that exists but fails to parse is an error.
pub fn load_or_default() -> Result<SimConfig, ConfigError> {
    load_or_default_from(&default_config_path())
}

/// [`load_or_default`] for an explicit path.
pub fn load_or_default_from(path: &Path) -> Result<SimConfig, ConfigError> {
    if path.is_file() {
        SimConfig::load(path)
    } else {
        tracing::debug!(path = %path.display(), "no sim config, using defaults");
        Ok(SimConfig::default())
    }
}

/// Find a saved circuit by name.
///
/// The name can be a path to an existing file, or a circuit name (with or
/// without the `.arena` extension) looked up in the user circuits directory.
pub fn find_circuit(name: &str) -> Option<PathBuf> {
    find_circuit_in(name, &user_circuits_dir())
}

/// [`find_circuit`] against an explicit circuits directory.
pub fn find_circuit_in(name: &str, dir: &Path) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if path.extension().is_some_and(|e| e == ARENA_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}.{ARENA_EXTENSION}")
    };
    let candidate = dir.join(filename);
    candidate.is_file().then_some(candidate)
}

/// Ensure the user config directory exists.
pub fn ensure_user_config_dir() -> Result<PathBuf, ConfigError> {
    ensure_dir(user_config_dir())
}

/// Ensure the user circuits directory exists.
pub fn ensure_user_circuits_dir() -> Result<PathBuf, ConfigError> {
    ensure_dir(user_circuits_dir())
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// List saved circuits in a directory, sorted by path.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn list_circuits_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut circuits: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == ARENA_EXTENSION))
        .collect();
    circuits.sort();
    circuits
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_are_under_app_dir() {
        assert!(user_config_dir().ends_with(APP_NAME));
        assert!(default_config_path().ends_with("gatework/sim.toml"));
        assert!(user_circuits_dir().ends_with("gatework/circuits"));
    }

    #[test]
    fn test_find_circuit_by_name_and_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("adder.arena");
        std::fs::write(&file, [0u8; 4]).unwrap();

        assert_eq!(find_circuit_in("adder", dir.path()), Some(file.clone()));
        assert_eq!(find_circuit_in("adder.arena", dir.path()), Some(file.clone()));
        let as_path = file.to_string_lossy().into_owned();
        assert_eq!(find_circuit_in(&as_path, dir.path()), Some(file));
        assert_eq!(find_circuit_in("missing", dir.path()), None);
    }

    #[test]
    fn test_list_circuits_filters_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.arena"), []).unwrap();
        std::fs::write(dir.path().join("a.arena"), []).unwrap();
        std::fs::write(dir.path().join("notes.txt"), []).unwrap();

        let names: Vec<String> = list_circuits_in_dir(dir.path())
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(String::from))
            .collect();
        assert_eq!(names, vec!["a.arena", "b.arena"]);
        assert!(list_circuits_in_dir(&dir.path().join("nope")).is_empty());
    }

    #[test]
    fn test_load_or_default_from_missing() {
        let dir = TempDir::new().unwrap();
        let config = load_or_default_from(&dir.path().join("sim.toml")).unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_load_or_default_from_broken_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sim.toml");
        std::fs::write(&path, "tick_rate_hz = [").unwrap();
        assert!(load_or_default_from(&path).is_err());
    }
}
