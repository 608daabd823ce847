use anyhow::{Context, Result};
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use workflow::cli::commands::{RunCommand, ValidateCommand};
use workflow::cli::output::*;
use workflow::cli::{Cli, Command};
use workflow::core::config::WorkflowConfig;
use workflow::core::UpdateReport;
use workflow::execution::{SharedWorkflow, WorkflowEvent};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_workflow(cmd, cli.verbose).await?,
        Command::Validate(cmd) => validate_workflow(cmd)?,
    }

    Ok(())
}

async fn run_workflow(cmd: &RunCommand, verbose: bool) -> Result<()> {
    let config = WorkflowConfig::from_file(&cmd.file).context("Failed to load workflow")?;

    if !cmd.json {
        println!("{} Loaded workflow: {}", INFO, style(&config.name).bold());
    }

    let mut workflow = config.new_workflow();

    // Failures always reach the operator; everything else only when verbose
    let quiet = cmd.json;
    workflow.add_event_handler(move |event| {
        if quiet {
            return;
        }
        if let WorkflowEvent::ComputationFailed(failure) = event {
            eprintln!("{}", format_failure(failure));
        } else if verbose {
            if let Some(line) = format_event(event) {
                println!("{}", line);
            }
        }
    });

    let mut run: Option<UpdateReport> = None;
    for report in config.populate(&mut workflow)? {
        absorb(&mut run, report);
    }

    let shared = SharedWorkflow::new(workflow);
    for change in &cmd.set {
        if !cmd.json {
            println!(
                "{} {}.{} = {}",
                INFO,
                style(&change.stage).cyan(),
                change.key,
                style(&change.value).dim()
            );
        }
        let report = shared
            .set_parameter(&change.stage, &change.key, change.value.clone())
            .await
            .with_context(|| format!("Failed to set {}.{}", change.stage, change.key))?;
        absorb(&mut run, report);
    }

    // The final state decides the outcome; failures fixed by a later
    // change do not count against the run
    let snapshots = shared.snapshots().await;
    let invalid = snapshots.iter().filter(|s| !s.status.is_valid()).count();
    let errored = snapshots.iter().filter(|s| s.last_error.is_some()).count();

    if cmd.json {
        let failures = run.as_ref().map(|r| r.failures.as_slice()).unwrap_or_default();
        let data = serde_json::json!({
            "name": config.name,
            "stages": snapshots,
            "failures": failures,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!();
        for snapshot in &snapshots {
            println!("{}", format_stage(snapshot));
        }
    }

    if invalid == 0 && errored == 0 {
        if !cmd.json {
            println!(
                "\n{} {} is {}",
                CHECK,
                style(&config.name).bold(),
                style("valid").green()
            );
        }
        Ok(())
    } else {
        if !cmd.json {
            println!(
                "\n{} {} has {} invalid stage(s) and {} stage(s) with errors",
                CROSS,
                style(&config.name).bold(),
                style(invalid).red(),
                style(errored).red()
            );
        }
        error!("Workflow '{}' did not settle valid", config.name);
        std::process::exit(1);
    }
}

/// Fold a cascade's report into the run's report
fn absorb(run: &mut Option<UpdateReport>, report: UpdateReport) {
    match run {
        Some(run) => run.merge(report),
        None => *run = Some(report),
    }
}

fn validate_workflow(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating workflow...", INFO);

    match WorkflowConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Workflow definition is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Stages: {}", style(config.stages.len()).cyan());
            for stage in &config.stages {
                println!(
                    "    {} [{}] {} view(s)",
                    style(&stage.name).bold(),
                    style(&stage.operation).dim(),
                    stage.views.len()
                );
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {:#}", style(e).red());
            std::process::exit(1);
        }
    }
}
