//! Async Probe Example
//!
//! Demonstrates `call_async` with many concurrent tasks hitting a circuit
//! that is on probation: only the configured number of probes reach the
//! dependency, everything else is rejected immediately.
//!
//! Run with: cargo run --example async_probe --features async

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use breaker::{Circuit, CircuitError, ManualClock, Options};

#[tokio::main]
async fn main() {
    let clock = ManualClock::new();
    let circuit = Arc::new(Circuit::new(
        "search",
        Options::new()
            .with_failure_threshold(1)
            .with_half_open_requests(2)
            .with_open_duration(Duration::from_secs(30))
            .with_clock(clock.clone()),
    ));

    // trip it
    let _ = circuit
        .call_async((), |_| async { Err::<(), _>("index unavailable") })
        .await;
    println!("after failure: {}", circuit.state());

    clock.advance(Duration::from_secs(30));
    println!("after 30s: {}", circuit.state());

    let reached = Arc::new(AtomicU32::new(0));
    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let circuit = circuit.clone();
            let reached = reached.clone();
            tokio::spawn(async move {
                let result = circuit
                    .call_async(i, |query| async move {
                        reached.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        println!("  probe {} answered", query);
                        Ok::<(), &str>(())
                    })
                    .await;
                matches!(result, Err(CircuitError::Open(_)))
            })
        })
        .collect();

    let mut rejected = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            rejected += 1;
        }
    }

    println!(
        "{} probes reached the dependency, {} rejected, circuit is {}",
        reached.load(Ordering::SeqCst),
        rejected,
        circuit.state()
    );
}
