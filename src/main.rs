//! Session Cache - snapshot handoff tool
//!
//! Restores a cache snapshot from stdin, runs one memoized processing phase
//! and writes the resulting snapshot to stdout.

use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_cache::{CacheConfig, CacheHandler, Value};

/// Number of Fibonacci terms memoized per phase.
const TERMS: i64 = 30;

/// Main entry point.
///
/// # Sequence
/// 1. Initialize tracing subscriber (stderr) for logging
/// 2. Load configuration from environment variables
/// 3. Restore the previous phase's snapshot from stdin, if any
/// 4. Memoize the phase's computations through the cache
/// 5. Print the new snapshot to stdout
fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: enabled={}, default_ttl={}ms",
        config.enabled,
        config.ttl.num_milliseconds()
    );

    let mut cache = CacheHandler::from_config(&config);

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read snapshot from stdin")?;
    if input.trim().is_empty() {
        info!("No snapshot on stdin, starting cold");
    } else {
        cache
            .deserialize(&input)
            .context("failed to restore snapshot")?;
        info!("Snapshot restored: {} entries", cache.len());
    }

    let mut computed = 0;
    for n in 0..=TERMS {
        cache.get_or_set_with(format!("fib:{}", n), None, || {
            computed += 1;
            Value::Int(fib(n))
        })?;
    }
    info!("Phase complete: {} of {} terms computed", computed, TERMS + 1);

    let snapshot = cache.serialize().context("failed to serialize cache")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", snapshot).context("failed to write snapshot")?;

    Ok(())
}

fn fib(n: i64) -> i64 {
    let (mut a, mut b) = (0i64, 1i64);
    for _ in 0..n {
        (a, b) = (b, a + b);
    }
    a
}
