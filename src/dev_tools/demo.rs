use crate::config::ProfilerConfig;
use crate::registry::Registry;
use std::path::PathBuf;
use std::time::Duration;

/// Instrument a small workload and export its report
pub fn run_demo(config: &ProfilerConfig, program_name: &str) -> anyhow::Result<PathBuf> {
    let mut registry = Registry::with_config(config);
    registry.initialize()?;

    registry.start("main")?;
    for n in [20u64, 25, 30] {
        let value = registry.time("fibonacci", || fibonacci(n))?;
        tracing::debug!("fibonacci({n}) = {value}");
    }

    for round in 0..3u64 {
        registry.start("io_wait")?;
        std::thread::sleep(Duration::from_millis(5 * (round + 1)));
        registry.stop("io_wait")?;
    }

    let primes = registry.time("sieve", || sieve(200_000))?;
    tracing::debug!("{} primes below 200000", primes);
    registry.stop("main")?;

    let path = registry.export(program_name)?;
    let report = registry.snapshot(program_name)?;
    print!("{}", report.summary(10));
    registry.cleanup()?;
    Ok(path)
}

fn fibonacci(n: u64) -> u64 {
    match n {
        0 | 1 => n,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}

fn sieve(limit: usize) -> usize {
    let mut composite = vec![false; limit + 1];
    let mut count = 0;
    for i in 2..=limit {
        if !composite[i] {
            count += 1;
            let mut j = i * i;
            while j <= limit {
                composite[j] = true;
                j += i;
            }
        }
    }
    count
}
