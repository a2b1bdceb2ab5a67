mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigCommands};
use cott_config::{ConfigLoader, CottConfig, LogLevel};
use cott_engine::ReportBuilder;
use cott_logging::{init_logging, init_simple_tracing};
use cott_output::ReportWriter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Load configuration from file, applying the `--log-level` override
fn load_config(config_path: Option<&PathBuf>, log_level: Option<&str>) -> Result<CottConfig> {
    let loader = ConfigLoader::new();
    let mut config = loader
        .load(config_path)
        .context(match config_path {
            Some(path) => format!("Failed to load configuration from {:?}", path),
            None => "Failed to load configuration from config.yaml".to_string(),
        })?;

    if let Some(level) = log_level {
        config.logging.level = level.parse::<LogLevel>().map_err(|e| anyhow!(e))?;
    }

    Ok(config)
}

/// Run every configured case and write the report
async fn run_command(
    config_path: Option<&PathBuf>,
    log_level: Option<&str>,
    report_path: Option<&PathBuf>,
) -> Result<()> {
    let config = load_config(config_path, log_level)?;

    // Keep the guard alive until the report is written
    let _guard = init_logging(&config.logging).context("Failed to initialize logging")?;

    let runtime = cott_runtime::from_config(&config.runtime)
        .context("Failed to set up the instance runtime")?;
    info!(
        runtime = runtime.name(),
        cases = config.test_cases.len(),
        "Starting benchmark run"
    );

    let report = ReportBuilder::new(runtime, config.execution.clone())
        .run(&config.test_cases)
        .await
        .context("Benchmark run failed")?;

    let mut writer = ReportWriter::new(config.report.clone());
    if let Some(path) = report_path {
        writer = writer.with_path(path);
    }
    let summary = writer
        .write(&report)
        .await
        .context("Failed to write the report")?;

    let failed = report.len() - report.clean_cases();
    if failed > 0 {
        warn!(failed, "Some test cases recorded errors");
    }
    println!(
        "Report with {} test case(s) written to {}",
        report.len(),
        summary.path.display()
    );
    Ok(())
}

/// Handle configuration validation
fn handle_config_validate(config_path: Option<&PathBuf>, log_level: Option<&str>) -> Result<()> {
    init_simple_tracing(log_level.unwrap_or("info"))?;

    match load_config(config_path, log_level) {
        Ok(config) => {
            println!(
                "Configuration is valid ({} test case(s))",
                config.test_cases.len()
            );
            info!("Configuration validation passed");
            Ok(())
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            Err(e)
        }
    }
}

/// Handle sample configuration generation
fn handle_config_generate(output: Option<&Path>, force: bool) -> Result<()> {
    let sample = CottConfig::generate_sample();

    let Some(output) = output else {
        print!("{}", sample);
        return Ok(());
    };

    if output.exists() && !force {
        return Err(anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    fs::write(output, sample)
        .with_context(|| format!("Failed to write configuration to {:?}", output))?;

    println!("Sample configuration written to {}", output.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = cli.log_level.as_deref();

    match &cli.command {
        Some(Commands::Run { report }) => {
            run_command(cli.config.as_ref(), log_level, report.as_ref()).await
        }
        Some(Commands::Config { config_cmd }) => match config_cmd {
            ConfigCommands::Validate => handle_config_validate(cli.config.as_ref(), log_level),
            ConfigCommands::Generate { output, force } => {
                handle_config_generate(output.as_deref(), *force)
            }
        },
        None => {
            // If no subcommand is provided, print help
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            cmd.print_help().context("Failed to print help")?;
            println!();
            Ok(())
        }
    }
}
