use anyhow::{Context, Result};
use bert_pipeline::cli::commands::{DefinitionCommand, EvaluateCommand, InspectCommand, ScanLogCommand};
use bert_pipeline::cli::output::*;
use bert_pipeline::cli::{Cli, Command};
use bert_pipeline::core::config::BuilderConfig;
use bert_pipeline::workflow::bert::{self, BertPipeline};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Logs go to stderr so the definition can be piped
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let mut config = BuilderConfig::load(cli.config.as_deref())
        .context("Failed to load builder config")?;
    cli.overrides.apply(&mut config);
    debug!(?config, "Resolved builder config");

    match &cli.command {
        Command::Definition(cmd) => print_definition(cmd, &config)?,
        Command::Inspect(cmd) => inspect(cmd, &config)?,
        Command::Evaluate(cmd) => evaluate(cmd, &config)?,
        Command::ScanLog(cmd) => scan_log(cmd)?,
    }

    Ok(())
}

fn build(config: &BuilderConfig) -> Result<BertPipeline> {
    config.validate().context("Invalid builder configuration")?;
    let session = config.session()?;
    let args = config.to_args(&session);
    bert::build(&session, &args).context("Failed to build pipeline")
}

fn print_definition(cmd: &DefinitionCommand, config: &BuilderConfig) -> Result<()> {
    let built = build(config)?;
    let json = built.pipeline.definition_json(cmd.pretty)?;

    match &cmd.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Wrote definition for {} to {}",
                CHECK,
                style(&built.pipeline.name).bold(),
                style(path.display()).cyan()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn inspect(cmd: &InspectCommand, config: &BuilderConfig) -> Result<()> {
    let built = build(config)?;
    let pipeline = &built.pipeline;
    let issues = pipeline.known_issues();

    if cmd.json {
        let data = serde_json::json!({
            "name": pipeline.name,
            "parameters": pipeline.parameter_names(),
            "steps": pipeline.step_names(),
            "model_metrics": built.model_metrics,
            "known_issues": issues,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Pipeline: {}", INFO, style(&pipeline.name).bold());

    println!("\n  {} ({})", style("Parameters").bold(), pipeline.parameters.len());
    for parameter in &pipeline.parameters {
        println!("    {}", format_parameter(parameter));
    }

    println!("\n  {} ({})", style("Steps").bold(), pipeline.steps.len());
    for step in &pipeline.steps {
        for line in format_step(step, 0).lines() {
            println!("    {}", line);
        }
    }

    if let Some(stats) = &built.model_metrics.model_statistics {
        println!("\n  {}", style("Model statistics").bold());
        println!("    {}", style(&stats.s3_uri).cyan());
    }

    if !issues.is_empty() {
        println!("\n  {} ({})", style("Known issues").bold(), issues.len());
        for issue in &issues {
            println!("    {}", format_issue(issue));
        }
    }

    Ok(())
}

fn evaluate(cmd: &EvaluateCommand, config: &BuilderConfig) -> Result<()> {
    let built = build(config)?;
    let condition = built
        .pipeline
        .step(bert::CONDITION_STEP)
        .and_then(|step| step.as_condition())
        .context("Pipeline has no accuracy condition")?;

    let content = std::fs::read_to_string(&cmd.metrics)
        .with_context(|| format!("Failed to read {}", cmd.metrics.display()))?;
    let report: serde_json::Value =
        serde_json::from_str(&content).context("Evaluation report is not valid JSON")?;

    let branch = condition.select_branch(&report)?;
    println!("{}", format_branch(branch, condition.steps_for(branch)));

    Ok(())
}

fn scan_log(cmd: &ScanLogCommand) -> Result<()> {
    let metrics = bert::metric_definitions()?;
    let content = std::fs::read_to_string(&cmd.log)
        .with_context(|| format!("Failed to read {}", cmd.log.display()))?;

    let mut found = 0;
    for (number, line) in content.lines().enumerate() {
        for metric in &metrics {
            if let Some(value) = metric.capture(line) {
                println!(
                    "{} {:>5}  {} = {}",
                    INFO,
                    style(number + 1).dim(),
                    style(&metric.name).bold(),
                    style(value).cyan()
                );
                found += 1;
            }
        }
    }

    if found == 0 {
        println!("{} No metric values found", WARN);
    }

    Ok(())
}
