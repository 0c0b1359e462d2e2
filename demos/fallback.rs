//! Fallback Example
//!
//! Demonstrates the basic circuit lifecycle against a flaky dependency:
//! - Failures trip the circuit
//! - Rejected calls fall back to a cached value without touching the dependency
//! - After the open duration, a probe call closes the circuit again
//!
//! Run with: cargo run --example fallback

use std::cell::Cell;
use std::time::Duration;

use breaker::{run, Circuit, CircuitError, Options, State};

#[derive(Debug)]
enum RateError {
    Timeout,
}

impl std::fmt::Display for RateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateError::Timeout => write!(f, "rate service timed out"),
        }
    }
}

/// A dependency that is down for the first few requests.
struct RateService {
    requests: Cell<u32>,
    outage: u32,
}

impl RateService {
    fn fetch(&self, currency: &str) -> Result<f64, RateError> {
        let n = self.requests.get();
        self.requests.set(n + 1);
        if n < self.outage {
            Err(RateError::Timeout)
        } else if currency == "EUR" {
            Ok(0.92)
        } else {
            Ok(1.0)
        }
    }
}

fn rate(circuit: &Circuit<RateError>, service: &RateService, cached: f64) -> f64 {
    match run("EUR", circuit, |currency| service.fetch(currency)) {
        Ok(rate) => {
            println!("  live rate: {}", rate);
            rate
        }
        Err(CircuitError::Open(open)) => {
            println!("  {} -> using cached rate {}", open, cached);
            cached
        }
        Err(CircuitError::Inner(e)) => {
            println!("  {} -> using cached rate {}", e, cached);
            cached
        }
    }
}

fn main() {
    println!("=== Circuit Breaker Fallback ===");

    let circuit = Circuit::new(
        "rates",
        Options::new()
            .with_failure_threshold(3)
            .with_success_threshold(1)
            .with_open_duration(Duration::from_millis(200))
            .on_state_change(|name, from, to| println!("  [{}] {} -> {}", name, from, to)),
    );
    let service = RateService {
        requests: Cell::new(0),
        outage: 3,
    };

    println!("\nDuring the outage:");
    for _ in 0..5 {
        rate(&circuit, &service, 0.90);
    }
    println!(
        "  dependency saw {} requests (2 were shed)",
        service.requests.get()
    );

    println!("\nAfter the open duration:");
    std::thread::sleep(Duration::from_millis(250));
    assert_eq!(circuit.state(), State::Probation);
    rate(&circuit, &service, 0.90);
    println!("  circuit is {}", circuit.state());
}
