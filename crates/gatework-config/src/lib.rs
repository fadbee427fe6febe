//! Settings and user paths for gatework.
//!
//! - [`SimConfig`]: TOML simulation settings (tick rate, settle cap, driver
//!   flags), loaded with serde defaults and validated
//! - [`paths`]: platform config directory, default settings file, and the
//!   saved-circuit directory
//! - [`ConfigError`]: error type shared by both
//!
//! # Example
//!
//! ```rust
//! use gatework_config::SimConfig;
//! use gatework_core::{Circuit, Simulation};
//!
//! let config = SimConfig::from_toml("max_settle_rounds = 16\ncarry_over_state = false")?;
//! let mut sim = Simulation::new(Circuit::new());
//! config.apply(&mut sim);
//! sim.compile();
//! assert!(sim.settle(config.max_settle_rounds).converged);
//! # Ok::<(), gatework_config::ConfigError>(())
//! ```

mod config;
mod error;
#[cfg(feature = "std")]
pub mod paths;

pub use config::{MAX_TICK_RATE_HZ, SimConfig};
pub use error::ConfigError;
