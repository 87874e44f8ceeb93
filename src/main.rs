//! Overseer - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use overseer::{
    cli::{Args, Commands, Config, RunSelection},
    telemetry::TelemetryDisplay,
    tools::{BatchEntry, CancelHandle, ExecutionResult, ToolCategory, ToolDefinition, ToolRuntime},
    OverseerError,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    overseer::logging::init(args.verbosity());

    let config = Config::load(args.config.clone()).context("Error loading configuration")?;

    match &args.command {
        Commands::List { category } => {
            let runtime = ToolRuntime::from_config(&config).context("Invalid tool configuration")?;
            list_tools(&runtime, *category);
            Ok(())
        }
        Commands::Run { parallel, json, .. } => {
            let mut options = config.runner_options();
            if let Some(width) = parallel {
                options = options.with_max_parallel(*width);
            }
            let runtime = ToolRuntime::new(config.tool_definitions(), options)
                .context("Invalid tool configuration")?;

            let selection = args
                .command
                .selection()
                .unwrap_or(RunSelection::All);
            let code = run(&runtime, selection, *json).await?;

            // stdout carries only the JSON document in --json mode
            if !*json {
                TelemetryDisplay::new(runtime.telemetry().clone(), args.verbosity())
                    .display_summary();
            }
            std::process::exit(code);
        }
    }
}

/// Run the selection and print results; returns the process exit code
async fn run(runtime: &ToolRuntime, selection: RunSelection, json: bool) -> Result<i32> {
    let cancel = install_ctrl_c();
    let token = cancel.token();

    let entries = match selection {
        RunSelection::One(name) => match runtime.run_one_with_cancel(&name, &token).await {
            Ok(entry) => vec![entry],
            Err(OverseerError::NotFound { name }) => {
                eprintln!("{} Tool '{}' not found", "Error:".red(), name);
                return Ok(1);
            }
            Err(e) => return Err(e.into()),
        },
        RunSelection::Category(category) => runtime.run_category(category, &token).await,
        RunSelection::All => runtime.run_all(&token).await,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            print_entry(entry);
        }
    }

    let all_ok = entries
        .iter()
        .all(|e| e.result().map_or(false, |r| r.succeeded));
    Ok(if all_ok { 0 } else { 2 })
}

/// First Ctrl-C cancels the running tool or batch
fn install_ctrl_c() -> CancelHandle {
    let handle = CancelHandle::new();
    let on_signal = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            on_signal.cancel();
        }
    });
    handle
}

fn print_entry(entry: &BatchEntry) {
    println!("\n=== {} ===", entry.tool_name().bold());
    match entry {
        BatchEntry::Completed(result) => print_result(result),
        BatchEntry::Skipped { interrupted, .. } => {
            let reason = if *interrupted {
                "interrupted by cancellation"
            } else {
                "not started"
            };
            println!("{} {}", "Skipped:".yellow(), reason);
        }
    }
}

fn print_result(result: &ExecutionResult) {
    let success = if result.succeeded {
        "true".green()
    } else {
        "false".red()
    };
    println!("Success: {} ({} ms)", success, result.duration_ms);

    if let Some(error) = &result.error_message {
        println!("{} {}", "Error:".red(), error);
    } else if let Some(code) = result.exit_code.filter(|c| *c != 0) {
        println!("Exit code: {}", code);
    }

    if !result.standard_output.is_empty() {
        println!("\nOutput:\n{}", result.standard_output);
        if result.stdout_truncated {
            println!("{}", "[output truncated]".dimmed());
        }
    }
    if !result.standard_error.is_empty() {
        println!("\nErrors:\n{}", result.standard_error);
        if result.stderr_truncated {
            println!("{}", "[output truncated]".dimmed());
        }
    }
}

fn list_tools(runtime: &ToolRuntime, category: Option<ToolCategory>) {
    let tools: Vec<&ToolDefinition> = match category {
        Some(category) => runtime.list_by_category(category),
        None => runtime.list_all().iter().collect(),
    };

    println!("\n{}", "Available Tools:".bold());
    for tool in tools {
        println!("\n{}", tool.name.bold());
        println!("Type: {}", tool.category);
        println!("Path: {}", tool.executable_path.display());
        if !tool.arguments.is_empty() {
            println!("Arguments: {}", tool.arguments.join(" "));
        }
        if let Some(dir) = &tool.working_directory {
            println!("Working Directory: {}", dir.display());
        }
        match tool.timeout() {
            Some(limit) => println!("Timeout: {}s", limit.as_secs()),
            None => println!("Timeout: none"),
        }
    }
}
