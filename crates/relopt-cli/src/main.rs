//! relopt CLI: optimize, explain and validate serialized logical plans.

use clap::{Parser, Subcommand, ValueEnum};
use relopt_core::config::OptimizerConfig;
use relopt_logical::LogicalPlan;
use relopt_optimizer::Optimizer;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relopt")]
#[command(about = "Rule-based logical plan optimizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a plan and print the result
    Optimize {
        /// Path to the plan (JSON, or YAML for .yaml/.yml)
        #[arg(short, long)]
        plan: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Explain)]
        format: OutputFormat,

        /// Iteration cap for fixed-point batches (overrides config)
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Record before/after plans for each batch
        #[arg(long)]
        trace: bool,

        /// Fail if a bounded batch does not converge
        #[arg(long)]
        strict: bool,

        /// Skip post-batch verification
        #[arg(long)]
        no_verify: bool,

        /// Print the per-batch report to stderr
        #[arg(long)]
        report: bool,
    },

    /// Show a plan before and after optimization
    Explain {
        /// Path to the plan
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Check that a plan parses and is fully resolved
    Validate {
        /// Path to the plan
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// List the batches and rules in execution order
    Rules,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
    Explain,
}

/// Command-line settings layered over `OptimizerConfig::from_env()`.
#[derive(Debug, Default)]
struct Overrides {
    max_iterations: Option<usize>,
    trace: bool,
    strict: bool,
    no_verify: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            plan,
            format,
            max_iterations,
            trace,
            strict,
            no_verify,
            report,
        } => {
            let overrides = Overrides {
                max_iterations,
                trace,
                strict,
                no_verify,
            };
            if let Err(e) = optimize_plan(&plan, format, &overrides, report) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Explain { plan } => {
            if let Err(e) = explain_plan(&plan) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { plan } => {
            if let Err(e) = validate_plan(&plan) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Plan is resolved");
        }
        Commands::Rules => list_rules(),
    }
}

fn apply_overrides(cfg: &mut OptimizerConfig, overrides: &Overrides) {
    if let Some(max) = overrides.max_iterations {
        cfg.max_iterations = Some(max);
    }
    if overrides.trace {
        cfg.trace_plans = true;
    }
    if overrides.strict {
        cfg.strict_convergence = true;
    }
    if overrides.no_verify {
        cfg.verify = false;
    }
}

fn parse_plan(content: &str, yaml: bool) -> Result<LogicalPlan, Box<dyn std::error::Error>> {
    if yaml {
        Ok(serde_yaml::from_str(content)?)
    } else {
        Ok(serde_json::from_str(content)?)
    }
}

fn load_plan(path: &Path) -> Result<LogicalPlan, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let plan = parse_plan(&content, yaml)?;
    tracing::info!(path = %path.display(), root = plan.node_name(), "plan loaded");
    Ok(plan)
}

fn optimize_plan(
    path: &Path,
    format: OutputFormat,
    overrides: &Overrides,
    report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let plan = load_plan(path)?;

    let mut config = OptimizerConfig::from_env();
    apply_overrides(&mut config, overrides);

    let optimized = Optimizer::new(config).optimize_with_report(plan)?;
    if report {
        eprint!("{}", optimized.format_trace());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&optimized.plan)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&optimized.plan)?),
        OutputFormat::Explain => print!("{}", optimized.plan.explain()),
    }

    Ok(())
}

fn explain_plan(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let plan = load_plan(path)?;
    let optimizer = Optimizer::new(OptimizerConfig::from_env());
    let optimized = optimizer.optimize_with_report(plan.clone())?;

    println!("== Input Plan ==");
    print!("{}", plan.explain());
    println!();
    println!("== Optimized Plan ==");
    print!("{}", optimized.plan.explain());
    println!();
    println!("== Batches ==");
    for batch in &optimized.batches {
        println!(
            "  {}: {} after {} iteration(s), {} rule application(s)",
            batch.name,
            batch.outcome.label(),
            batch.outcome.iterations(),
            batch.rules_fired.len()
        );
    }

    Ok(())
}

fn validate_plan(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let plan = load_plan(path)?;
    if let Some(reason) = plan.resolution_error() {
        return Err(reason.into());
    }
    Ok(())
}

fn list_rules() {
    let optimizer = Optimizer::new(OptimizerConfig::from_env());
    for (i, batch) in optimizer.batches().iter().enumerate() {
        println!("{}. {} ({})", i + 1, batch.name, batch.strategy);
        for rule in &batch.rules {
            println!("     {:<30} {}", rule.name(), rule.description());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_config() {
        let mut config = OptimizerConfig::default();
        let overrides = Overrides {
            max_iterations: Some(4),
            strict: true,
            no_verify: true,
            ..Default::default()
        };
        apply_overrides(&mut config, &overrides);
        assert_eq!(config.max_iterations, Some(4));
        assert!(config.strict_convergence);
        assert!(!config.verify);
        assert!(!config.trace_plans);
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut config = OptimizerConfig::default().with_max_iterations(9);
        apply_overrides(&mut config, &Overrides::default());
        assert_eq!(config.max_iterations, Some(9));
        assert!(config.verify);
    }

    #[test]
    fn json_and_yaml_plans_parse_alike() {
        let json = r#"{
            "Limit": {
                "count": 5,
                "input": {
                    "Relation": {
                        "name": "t",
                        "output": [
                            {"id": 1, "name": "a", "data_type": "Int64", "nullable": true}
                        ]
                    }
                }
            }
        }"#;
        let yaml = "
Limit:
  count: 5
  input:
    Relation:
      name: t
      output:
        - id: 1
          name: a
          data_type: Int64
          nullable: true
";
        let from_json = parse_plan(json, false).unwrap();
        let from_yaml = parse_plan(yaml, true).unwrap();
        assert_eq!(from_json, from_yaml);
        assert!(from_json.is_resolved());
    }

    #[test]
    fn verify_command_line_parses() {
        Cli::try_parse_from([
            "relopt",
            "optimize",
            "--plan",
            "p.json",
            "--format",
            "json",
            "--max-iterations",
            "3",
        ])
        .unwrap();
    }
}
