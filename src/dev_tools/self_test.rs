use crate::registry::Registry;
use crate::shared::SharedRegistry;
use futures::future;
use std::time::{Duration, Instant};

/// Tolerance for a single measured interval against its sleep duration
const ACCURACY_TOLERANCE: Duration = Duration::from_millis(50);

/// Measure concurrent sleeps through a shared registry and check that the
/// recorded intervals match what the tasks actually waited
pub async fn test_registry_timing(tasks: usize, rounds: u32) -> anyhow::Result<()> {
    println!("🧪 Starting registry timing self-test...");
    println!("⏱️  {tasks} tasks × {rounds} rounds");

    let shared = SharedRegistry::new(Registry::new().with_initial_capacity(2));
    shared.initialize()?;

    let test_start = Instant::now();
    let workers = (0..tasks).map(|i| {
        let shared = shared.clone();
        let pause = Duration::from_millis(10 + 5 * i as u64);
        tokio::spawn(async move {
            let name = format!("task-{i}");
            for _ in 0..rounds {
                shared.start(&name)?;
                tokio::time::sleep(pause).await;
                shared.stop(&name)?;
            }
            Ok::<_, crate::error::ProfilerError>(TestResult {
                name,
                expected: pause * rounds,
                measured: Duration::ZERO,
                calls: 0,
            })
        })
    });

    let mut results = Vec::new();
    for joined in future::join_all(workers).await {
        results.push(joined??);
    }

    let report = shared.snapshot("self-test")?;
    for result in &mut results {
        if let Some(function) = report.functions.iter().find(|f| f.name == result.name) {
            result.measured = Duration::from_secs_f64(function.exec_time);
            result.calls = function.call_count;
        }
    }
    shared.cleanup()?;

    println!("🔍 Finished in {}ms\n", test_start.elapsed().as_millis());
    analyze_test_results(&results, rounds)
}

#[derive(Debug)]
struct TestResult {
    name: String,
    expected: Duration,
    measured: Duration,
    calls: u64,
}

impl TestResult {
    /// Sleeps never return early, so only overshoot is tolerated
    fn is_accurate(&self, rounds: u32) -> bool {
        self.measured >= self.expected
            && self.measured - self.expected <= ACCURACY_TOLERANCE * rounds
    }
}

fn analyze_test_results(results: &[TestResult], rounds: u32) -> anyhow::Result<()> {
    println!("📊 Test Results Analysis:");
    println!("═══════════════════════");

    if results.is_empty() {
        return Err(anyhow::anyhow!("No timing tasks were run"));
    }

    for result in results {
        println!(
            "  {}: expected {}ms, measured {}ms, {} calls ({})",
            result.name,
            result.expected.as_millis(),
            result.measured.as_millis(),
            result.calls,
            if result.is_accurate(rounds) { "✅ OK" } else { "❌ FAILED" }
        );
    }

    let miscounted: Vec<_> = results
        .iter()
        .filter(|r| r.calls != u64::from(rounds))
        .collect();
    let inaccurate = results.iter().filter(|r| !r.is_accurate(rounds)).count();

    println!("\n🏆 Overall Result:");
    if miscounted.is_empty() && inaccurate == 0 {
        println!("✅ PASSED - Recorded intervals match measured sleeps");
        Ok(())
    } else {
        for result in &miscounted {
            println!(
                "   → {} recorded {} calls (expected {})",
                result.name, result.calls, rounds
            );
        }
        if inaccurate > 0 {
            println!("   → {inaccurate} timers outside tolerance");
        }
        Err(anyhow::anyhow!("Registry timing self-test failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_allows_only_bounded_overshoot() {
        let result = TestResult {
            name: "t".to_string(),
            expected: Duration::from_millis(100),
            measured: Duration::from_millis(120),
            calls: 2,
        };
        assert!(result.is_accurate(2));

        let early = TestResult {
            measured: Duration::from_millis(90),
            ..result
        };
        assert!(!early.is_accurate(2));
    }

    #[test]
    fn miscounted_calls_fail_the_analysis() {
        let results = vec![TestResult {
            name: "t".to_string(),
            expected: Duration::from_millis(10),
            measured: Duration::from_millis(11),
            calls: 1,
        }];
        assert!(analyze_test_results(&results, 2).is_err());
        assert!(analyze_test_results(&results, 1).is_ok());
    }
}
