use clap::{Parser, Subcommand};
use khronos::config::ProfilerConfig;
use khronos::dev_tools;
use khronos::logging::{apply_log_level, init_logging, log_config_error};
use khronos::report::Report;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "khronos")]
#[command(about = "Function-level timing registry and report tools")]
struct Args {
    /// Configuration file (defaults to khronos.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Profile a sample workload and write its report
    Demo {
        /// Program name used for the report file and metadata
        #[arg(long, default_value = "demo")]
        program: String,
    },
    /// Check recorded intervals against concurrent sleeps
    SelfTest {
        #[arg(long, default_value_t = 4)]
        tasks: usize,
        #[arg(long, default_value_t = 5)]
        rounds: u32,
    },
    /// Validate a report file and print its slowest functions
    Inspect {
        path: PathBuf,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let log_level = init_logging();

    let config = match &args.config {
        Some(path) => ProfilerConfig::load_from_file(path),
        None => ProfilerConfig::load_default(),
    }
    .map_err(|e| {
        log_config_error(&e.to_string());
        e
    })?;

    apply_log_level(&log_level, &config.logging.level)?;

    match args.command {
        Command::Demo { program } => {
            let path = dev_tools::run_demo(&config, &program)?;
            println!("✅ Report written to {}", path.display());
            Ok(())
        }
        Command::SelfTest { tasks, rounds } => {
            dev_tools::test_registry_timing(tasks, rounds).await
        }
        Command::Inspect { path, top } => {
            let report = Report::load(&path)?;
            print!("{}", report.summary(top));
            Ok(())
        }
    }
}
