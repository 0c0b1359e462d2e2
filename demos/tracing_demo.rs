//! Demonstrates the structured events a circuit emits
//!
//! Run with: cargo run --example tracing_demo

use std::time::Duration;

use breaker::{Circuit, ManualClock, Options};

fn main() {
    // Set up tracing subscriber
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let clock = ManualClock::new();
    let circuit = Circuit::new(
        "ledger",
        Options::new()
            .with_failure_threshold(2)
            .with_success_threshold(1)
            .with_open_duration(Duration::from_secs(10))
            .with_clock(clock.clone()),
    );

    tracing::info!("Driving circuit through a full cycle");

    for _ in 0..2 {
        let _ = circuit.call((), |_| Err::<(), _>("write conflict"));
    }
    let _ = circuit.call((), |_| Ok(()));

    clock.advance(Duration::from_secs(10));
    match circuit.call((), |_| Ok(())) {
        Ok(()) => tracing::info!(state = %circuit.state(), "probe succeeded"),
        Err(e) => tracing::error!("probe failed: {}", e),
    }
}
