//! CLI command implementations.

pub mod common;
pub mod demo;
pub mod dump;
pub mod info;
pub mod run;
