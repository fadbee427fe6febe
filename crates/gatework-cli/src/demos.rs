//! Built-in demo circuits.

use gatework_core::{ButtonKind, Circuit, CircuitError, DisplayKind, GateKind, UnaryKind};

/// A named circuit builder.
#[derive(Debug, Clone, Copy)]
pub struct DemoInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub build: fn() -> Result<Circuit, CircuitError>,
}

/// All demos, in listing order.
pub fn available_demos() -> Vec<DemoInfo> {
    vec![
        DemoInfo {
            name: "half-adder",
            description: "Half adder wrapped in a function, both inputs high",
            build: half_adder,
        },
        DemoInfo {
            name: "bus",
            description: "Two 4-bit bus records sharing one wired-OR value",
            build: bus,
        },
        DemoInfo {
            name: "ring",
            description: "Three-inverter ring oscillator (never settles)",
            build: ring,
        },
        DemoInfo {
            name: "latch",
            description: "NOR set/reset latch with set held",
            build: latch,
        },
        DemoInfo {
            name: "digit",
            description: "Seven-segment display lit as the digit 3",
            build: digit,
        },
    ]
}

/// Looks up a demo by name, ignoring case.
pub fn find_demo(name: &str) -> Option<DemoInfo> {
    available_demos()
        .into_iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
}

fn half_adder_body() -> Result<Circuit, CircuitError> {
    let mut c = Circuit::new();
    let x = c.add_button(ButtonKind::Push);
    let y = c.add_button(ButtonKind::Push);
    let xor = c.add_gate(GateKind::Xor, 2)?;
    let and = c.add_gate(GateKind::And, 2)?;
    let sum = c.add_display(DisplayKind::LightBulb);
    let carry = c.add_display(DisplayKind::LightBulb);
    c.set_position(x, 2.0)?;
    c.set_position(y, 1.0)?;
    c.set_position(sum, 2.0)?;
    c.set_position(carry, 1.0)?;
    c.connect(x, 0, xor, 0)?;
    c.connect(y, 0, xor, 1)?;
    c.connect(x, 0, and, 0)?;
    c.connect(y, 0, and, 1)?;
    c.connect(xor, 0, sum, 0)?;
    c.connect(and, 0, carry, 0)?;
    Ok(c)
}

fn half_adder() -> Result<Circuit, CircuitError> {
    let mut c = Circuit::new();
    let a = c.add_button(ButtonKind::Toggle);
    let b = c.add_button(ButtonKind::Toggle);
    c.set_button_state(a, true)?;
    c.set_button_state(b, true)?;
    let adder = c.add_function(half_adder_body()?);
    let sum = c.add_display(DisplayKind::LightBulb);
    let carry = c.add_display(DisplayKind::LightBulb);
    c.connect(a, 0, adder, 0)?;
    c.connect(b, 0, adder, 1)?;
    c.connect(adder, 0, sum, 0)?;
    c.connect(adder, 1, carry, 0)?;
    Ok(c)
}

fn bus() -> Result<Circuit, CircuitError> {
    let mut c = Circuit::new();
    let west = c.add_bus("DATA", 4)?;
    let east = c.add_bus("DATA", 4)?;
    for (bus, bit) in [(west, 0), (west, 2), (east, 1)] {
        let button = c.add_button(ButtonKind::Toggle);
        c.set_button_state(button, bit != 2)?;
        c.connect(button, 0, bus, bit)?;
    }
    for bit in 0..4 {
        let lamp = c.add_display(DisplayKind::LightBulb);
        c.connect(east, bit, lamp, 0)?;
    }
    Ok(c)
}

fn ring() -> Result<Circuit, CircuitError> {
    let mut c = Circuit::new();
    let stages = [
        c.add_unary(UnaryKind::Not, 1)?,
        c.add_unary(UnaryKind::Not, 1)?,
        c.add_unary(UnaryKind::Not, 1)?,
    ];
    for (i, &stage) in stages.iter().enumerate() {
        let next = stages[(i + 1) % stages.len()];
        c.connect(stage, 0, next, 0)?;
    }
    let lamp = c.add_display(DisplayKind::LightBulb);
    c.connect(stages[0], 0, lamp, 0)?;
    Ok(c)
}

fn latch() -> Result<Circuit, CircuitError> {
    let mut c = Circuit::new();
    let set = c.add_button(ButtonKind::Push);
    let reset = c.add_button(ButtonKind::Push);
    c.set_button_state(set, true)?;
    let q = c.add_gate(GateKind::Nor, 2)?;
    let q_bar = c.add_gate(GateKind::Nor, 2)?;
    c.connect(reset, 0, q, 0)?;
    c.connect(q_bar, 0, q, 1)?;
    c.connect(set, 0, q_bar, 0)?;
    c.connect(q, 0, q_bar, 1)?;
    let lamp_q = c.add_display(DisplayKind::LightBulb);
    let lamp_q_bar = c.add_display(DisplayKind::LightBulb);
    c.connect(q, 0, lamp_q, 0)?;
    c.connect(q_bar, 0, lamp_q_bar, 0)?;
    Ok(c)
}

fn digit() -> Result<Circuit, CircuitError> {
    let mut c = Circuit::new();
    let high = c.add_button(ButtonKind::StaticToggle);
    c.set_button_state(high, true)?;
    let buffer = c.add_unary(UnaryKind::Buffer, 1)?;
    c.connect(high, 0, buffer, 0)?;
    let display = c.add_display(DisplayKind::SevenSegment);
    // Segments a, b, c, d and g.
    for segment in [0, 1, 2, 3, 6] {
        c.connect(buffer, 0, display, segment)?;
    }
    Ok(c)
}
