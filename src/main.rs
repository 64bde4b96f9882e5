//! Memocache self-check
//!
//! Runs a short memoization scenario against the cache described by the
//! `MEMOCACHE_*` environment variables and prints the resulting statistics.

use std::cell::Cell;

use anyhow::{ensure, Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memocache::{Cache, CacheConfig};

fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memocache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting memocache self-check");

    let config = CacheConfig::from_env().context("invalid MEMOCACHE_* configuration")?;
    info!(
        "Configuration loaded: path={:?}, ttl={:?}, noc={:?}, cache_size={:?}, algorithm={}",
        config.path, config.ttl, config.noc, config.cache_size, config.algorithm
    );

    let cache: Cache<u64> = Cache::new(config).context("failed to create cache")?;
    let invocations = Cell::new(0u64);
    let mut square = cache.memoize("square", |x: &u64| {
        invocations.set(invocations.get() + 1);
        x * x
    });

    for x in [2u64, 3, 2, 3, 2, 5, 2] {
        let result = square.call(x);
        ensure!(result == x * x, "square({}) returned {}", x, result);
    }

    // Every miss recomputes exactly once
    let stats = square.cache().stats();
    ensure!(
        invocations.get() == stats.misses,
        "{} invocations for {} misses",
        invocations.get(),
        stats.misses
    );

    info!(
        invocations = invocations.get(),
        hit_rate = stats.hit_rate(),
        "self-check passed"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
