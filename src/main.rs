use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use kiln_core::logger::Logger;
use kiln_core::parser::LogLevel;
use kiln_core::{
    BuildHistory, BuildHistoryEntry, BuildOptions, BuildReport, Builder, Cli, Commands, Config,
    HistoryCommands, HistoryType, RunHistory, RunHistoryEntry,
};

fn init_config(cli: &Cli, name: Option<String>) -> Result<()> {
    let root = cli.project_root();
    let config_path = root.join("kiln.toml");

    if config_path.exists() {
        anyhow::bail!(
            "kiln.toml already exists at {}. Remove it first if you want to reinitialize.",
            config_path.display()
        );
    }

    let mut config = Config::default();
    if let Some(name) = name {
        config.project.target = name;
    }

    config
        .save_to_file(&config_path)
        .context("Failed to save kiln.toml")?;

    println!("Created kiln.toml at {}", config_path.display());

    Ok(())
}

fn show_history(config: &Config, count: Option<usize>) -> Result<()> {
    let logger = Logger::new();
    let storage_path = config.storage_path();

    let builds = BuildHistory::new(storage_path.clone(), config.history.max_entries)
        .context("Failed to load build history")?;
    let runs = RunHistory::new(storage_path, config.history.max_entries)
        .context("Failed to load run history")?;

    if builds.entries().is_empty() && runs.entries().is_empty() {
        logger.log(LogLevel::Info, "No history found.");
        return Ok(());
    }

    let count = count.unwrap_or(10);

    if !builds.entries().is_empty() {
        logger.log(
            LogLevel::Info,
            &format!("Builds (last {}):", count.min(builds.entries().len())),
        );
        for entry in builds.entries().iter().rev().take(count) {
            logger.log(LogLevel::Info, &format!("  {}", entry));
        }
    }

    if !runs.entries().is_empty() {
        logger.log(
            LogLevel::Info,
            &format!("Runs (last {}):", count.min(runs.entries().len())),
        );
        for entry in runs.entries().iter().rev().take(count) {
            logger.log(LogLevel::Info, &format!("  {}", entry));
        }
    }

    Ok(())
}

fn clear_history(config: &Config, history_type: HistoryType) -> Result<()> {
    let storage_path = config.storage_path();

    match history_type {
        HistoryType::Build => {
            let mut history = BuildHistory::new(storage_path, config.history.max_entries)
                .context("Failed to load build history")?;
            history.clear()?;
            println!("Build history cleared.");
        }
        HistoryType::Run => {
            let mut history = RunHistory::new(storage_path, config.history.max_entries)
                .context("Failed to load run history")?;
            history.clear()?;
            println!("Run history cleared.");
        }
        HistoryType::All => {
            let mut builds = BuildHistory::new(storage_path.clone(), config.history.max_entries)
                .context("Failed to load build history")?;
            builds.clear()?;

            let mut runs = RunHistory::new(storage_path, config.history.max_entries)
                .context("Failed to load run history")?;
            runs.clear()?;

            println!("All history cleared.");
        }
    }

    Ok(())
}

fn record_build(config: &Config, options: &BuildOptions, report: &BuildReport) -> Result<()> {
    if report.is_up_to_date() {
        return Ok(());
    }

    let mut entry = BuildHistoryEntry::new(options.toolchain.to_string());
    entry.duration = report.duration;
    entry.success = report.success();
    entry.forced = options.force;
    entry.compiled = report.compiled;
    entry.error_count = report.error_count;
    entry.warning_count = report.warning_count;

    let mut history = BuildHistory::new(config.storage_path(), config.history.max_entries)
        .context("Failed to load build history")?;
    history
        .add_entry(entry)
        .context("Failed to record build history")?;

    Ok(())
}

async fn run_binary(builder: &Builder, config: &Config, logger: &Logger) -> Result<i32> {
    let bin_dir = builder.bin_dir();
    let name = builder.run_target_name();
    let path = bin_dir.join(&name);

    logger.log(LogLevel::Info, &format!("Running {}", path.display()));

    let result = kiln_core::execute_binary(&path, &bin_dir).await?;

    let mut entry = RunHistoryEntry::new(name);
    entry.duration = result.duration;
    entry.exit_code = result.exit_code;
    entry.success = result.success;
    entry.failure_reason = result.failure_reason.clone();

    let mut history = RunHistory::new(config.storage_path(), config.history.max_entries)
        .context("Failed to load run history")?;
    history
        .add_entry(entry)
        .context("Failed to record run history")?;

    if let Some(reason) = &result.failure_reason {
        logger.log(LogLevel::Error, &format!("Program failed: {}", reason));
    }

    Ok(result.exit_code.unwrap_or(-1))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Init { name }) = &cli.command {
        init_config(&cli, name.clone())?;
        return Ok(());
    }

    let root = cli.project_root();
    let config = Config::load(&root, cli.config.as_deref())?;

    if let Some(Commands::History { command }) = &cli.command {
        match command {
            HistoryCommands::Show { count } => show_history(&config, *count)?,
            HistoryCommands::Clear { r#type } => clear_history(&config, *r#type)?,
        }
        return Ok(());
    }

    if !cli.has_action() {
        let logger = Logger::new();
        logger.log(
            LogLevel::Warning,
            "Nothing to do (try --build, --run or --help)",
        );
        return Ok(());
    }

    let options = BuildOptions::from_cli(&cli, &config)?;
    let logger = Arc::new(Logger::new());
    let builder = Builder::new(root, config.clone(), options.clone(), Arc::clone(&logger));

    if cli.debug {
        let code = builder.debug_build().await?;
        std::process::exit(code);
    }

    if cli.clean {
        builder.clean()?;
        logger.log(LogLevel::Info, "Cleaned output directories");
    }

    if cli.build {
        let report = builder.build().await?;
        record_build(&config, &options, &report)?;
        if let Some(code) = report.failure_code() {
            std::process::exit(code);
        }
    }

    if cli.run {
        let report = builder.build().await?;
        record_build(&config, &options, &report)?;
        if let Some(code) = report.failure_code() {
            std::process::exit(code);
        }

        let code = run_binary(&builder, &config, &logger).await?;
        if code != 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}
