//! Integration tests for gatework-config.
//!
//! These tests verify that settings loaded from disk drive a real simulation.

use gatework_config::{SimConfig, paths};
use gatework_core::{ButtonKind, Circuit, Simulation, UnaryKind};
use tempfile::TempDir;

fn ring() -> Circuit {
    let mut c = Circuit::new();
    let not = c.add_unary(UnaryKind::Not, 1).unwrap();
    c.connect(not, 0, not, 0).unwrap();
    c
}

/// The settle cap from a config file bounds a cyclic circuit.
#[test]
fn test_settle_cap_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sim.toml");
    SimConfig::new("capped")
        .with_max_settle_rounds(7)
        .save(&path)
        .unwrap();

    let config = paths::load_or_default_from(&path).unwrap();
    let mut sim = Simulation::new(ring());
    config.apply(&mut sim);
    sim.compile();
    let report = sim.settle(config.max_settle_rounds);
    assert!(!report.converged);
    assert_eq!(report.rounds, 7);
}

/// With carry-over, a held push button restarts released after a recompile;
/// without it, the level written into the circuit is kept.
#[test]
fn test_carry_over_flag_applies() {
    let mut circuit = Circuit::new();
    let push = circuit.add_button(ButtonKind::Push);

    let config = SimConfig::from_toml("carry_over_state = true").unwrap();
    let mut sim = Simulation::new(circuit.clone());
    config.apply(&mut sim);
    sim.compile();
    sim.press(push).unwrap();
    assert_eq!(sim.output(push, 0), Some(true));
    sim.compile();
    assert_eq!(sim.output(push, 0), Some(false));

    let config = SimConfig::from_toml("carry_over_state = false").unwrap();
    let mut sim = Simulation::new(circuit);
    config.apply(&mut sim);
    sim.compile();
    sim.press(push).unwrap();
    sim.compile();
    assert_eq!(sim.output(push, 0), Some(true));
}

/// A saved arena is found by bare name in a circuits directory.
#[test]
fn test_saved_circuit_lookup() {
    let dir = TempDir::new().unwrap();
    let mut sim = Simulation::new(ring());
    sim.compile();
    let path = dir.path().join(format!("ring.{}", paths::ARENA_EXTENSION));
    sim.arena().unwrap().save_to_file(&path).unwrap();

    let found = paths::find_circuit_in("ring", dir.path()).unwrap();
    let loaded = gatework_core::Arena::load_from_file(found).unwrap();
    assert_eq!(&loaded, sim.arena().unwrap());
    assert_eq!(paths::list_circuits_in_dir(dir.path()).len(), 1);
}
