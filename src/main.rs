//! Ratchet CLI - static-analysis budget gates

use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;

use ratchet::checks::{Checker, Project};
use ratchet::gate::{Analyzer, GateContext, GateDecision, GateReport};
use ratchet::git::incremental::IncrementalScopeResolver;
use ratchet::git::{derive_version, RepositoryInspector};
use ratchet::thresholds::ThresholdStore;
use ratchet::RatchetError;

#[derive(Parser)]
#[command(name = "ratchet")]
#[command(author, version, about = "Static-analysis budget gates for JVM builds")]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Strict CI mode: improvements fail instead of rewriting budgets
    #[arg(long, global = true, env = "RATCHET_CI", value_parser = FalseyValueParser::new())]
    ci: bool,

    /// Print results as JSON (logs go to stderr as JSON too)
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gate compiler warnings in a captured compiler log
    CheckCompilerWarnings {
        /// Compiler output log (defaults to reports.compiler_log)
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Gate checkstyle errors
    CheckStyleViolations {
        /// Checkstyle XML report (defaults to reports.checkstyle)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Gate SpotBugs/FindBugs bug instances
    CheckBugFinderReport {
        /// SpotBugs XML report (defaults to reports.spotbugs)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Gate detekt errors
    CheckDetektReport {
        /// Detekt checkstyle-format XML report (defaults to reports.detekt)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Gate JaCoCo coverage per counter type
    CheckCoverage {
        /// JaCoCo XML report (defaults to reports.coverage)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Run every gate and fail if any failed
    CheckAll,

    /// Show the current branch classification
    Branch,

    /// Print the artifact version for the current branch
    Version {
        /// Base version, e.g. 1.4.0-SNAPSHOT
        base: String,
    },

    /// List files changed since the closest stable ancestor
    ChangedFiles,

    /// Show configured budgets
    Thresholds,

    /// Show the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "ratchet=debug,info"
    } else {
        "ratchet=info,warn"
    };

    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    // Resolve project path
    let project_path = cli.project.canonicalize().unwrap_or(cli.project.clone());

    if !project_path.is_dir() {
        eprintln!(
            "{} Project directory does not exist: {}",
            "Error:".red().bold(),
            project_path.display()
        );
        std::process::exit(1);
    }

    let project = Project::load(&project_path).unwrap_or_else(|e| exit_with(&e));
    let repo = RepositoryInspector::new(project.dir());
    let checker = Checker::new(&project, &repo, GateContext { ci: cli.ci });

    match cli.command {
        Commands::CheckCompilerWarnings { log } => {
            let result = checker.check_count(Analyzer::Compiler, log.as_deref());
            finish_gate(result, cli.json)?;
        }

        Commands::CheckStyleViolations { report } => {
            let result = checker.check_count(Analyzer::Checkstyle, report.as_deref());
            finish_gate(result, cli.json)?;
        }

        Commands::CheckBugFinderReport { report } => {
            let result = checker.check_count(Analyzer::SpotBugs, report.as_deref());
            finish_gate(result, cli.json)?;
        }

        Commands::CheckDetektReport { report } => {
            let result = checker.check_count(Analyzer::Detekt, report.as_deref());
            finish_gate(result, cli.json)?;
        }

        Commands::CheckCoverage { report } => {
            let result = checker.check_coverage(report.as_deref());
            finish_gate(result, cli.json)?;
        }

        Commands::CheckAll => {
            let outcomes = checker.check_all();

            if cli.json {
                let entries: Vec<_> = outcomes
                    .iter()
                    .map(|o| match &o.result {
                        Ok(report) => json!({ "gate": o.gate, "report": report }),
                        Err(e) => json!({ "gate": o.gate, "error": e.to_string(), "exit_code": e.exit_code() }),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for outcome in &outcomes {
                    match &outcome.result {
                        Ok(report) => print_report(report),
                        Err(e) => eprintln!("{} [{}] {}", "Error:".red().bold(), outcome.gate, e),
                    }
                }
            }

            let failed = outcomes.iter().filter(|o| o.is_failure()).count();
            if failed > 0 {
                if !cli.json {
                    eprintln!(
                        "\n{} {} of {} gates failed",
                        "FAIL".red().bold(),
                        failed,
                        outcomes.len()
                    );
                }
                let code = outcomes
                    .iter()
                    .find_map(|o| o.result.as_ref().err().map(RatchetError::exit_code))
                    .unwrap_or(1);
                std::process::exit(code);
            }
        }

        Commands::Branch => {
            let classification = checker.classification().unwrap_or_else(|e| exit_with(&e));
            let suffix = classification.sanitized_suffix();

            if cli.json {
                let value = json!({
                    "branch": classification.branch,
                    "kind": classification.kind,
                    "tag": classification.tag,
                    "stable": classification.is_stable(),
                    "suffix": suffix,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                let stability = if classification.is_stable() {
                    "stable".green().bold()
                } else {
                    "development".yellow().bold()
                };
                println!("Branch: {}", classification.branch.cyan());
                println!("Kind:   {} ({})", classification.kind, stability);
                if let Some(tag) = &classification.tag {
                    println!("Tag:    {}", tag);
                }
                println!("Suffix: {}", suffix);
            }
        }

        Commands::Version { base } => {
            let classification = checker.classification().unwrap_or_else(|e| exit_with(&e));
            let version = derive_version(&base, classification);
            if cli.json {
                println!("{}", json!({ "version": version }));
            } else {
                println!("{}", version);
            }
        }

        Commands::ChangedFiles => {
            let resolver = IncrementalScopeResolver::from_config(&project.config().incremental)
                .unwrap_or_else(|e| exit_with(&e));
            let work_tree = repo.toplevel().unwrap_or_else(|e| exit_with(&e));
            let scope = resolver
                .resolve(&repo, &work_tree)
                .unwrap_or_else(|e| exit_with(&e));

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&scope)?);
            } else {
                match scope {
                    Some(scope) => {
                        println!(
                            "{} file(s) changed on {} since {} ({}, {} commits)",
                            scope.files.len(),
                            scope.branch.cyan(),
                            scope.ancestor.branch,
                            scope.ancestor.commit,
                            scope.ancestor.distance
                        );
                        for file in &scope.files {
                            println!("  {}", file.display());
                        }
                    }
                    None => println!("{} Incremental analysis not applicable, all files in scope", "SKIP".yellow().bold()),
                }
            }
        }

        Commands::Thresholds => {
            let config = project.config();
            let files = [
                config.static_analysis_path(project.dir()),
                config.coverage_path(project.dir()),
            ];

            let mut stores = Vec::new();
            for path in &files {
                stores.push((path, ThresholdStore::load(path).unwrap_or_else(|e| exit_with(&e))));
            }

            if cli.json {
                let value: serde_json::Map<String, serde_json::Value> = stores
                    .iter()
                    .map(|(path, store)| {
                        let budgets = store.as_ref().map(|s| {
                            s.iter()
                                .map(|(k, v)| (k.to_string(), json!(v)))
                                .collect::<serde_json::Map<_, _>>()
                        });
                        (path.display().to_string(), json!(budgets))
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                for (path, store) in &stores {
                    println!("{}", path.display().to_string().bold());
                    match store {
                        Some(store) if !store.is_empty() => {
                            for (key, value) in store.iter() {
                                println!("  {:<12} {}", key, value);
                            }
                        }
                        Some(_) => println!("  (empty)"),
                        None => println!("  {}", "(not found)".dimmed()),
                    }
                }
            }
        }

        Commands::Config => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(project.config())?);
            } else {
                let rendered = project.config().to_toml().unwrap_or_else(|e| exit_with(&e));
                print!("{}", rendered);
            }
        }
    }

    Ok(())
}

/// Prints a gate result and exits non-zero on failure.
fn finish_gate(result: ratchet::Result<GateReport>, json: bool) -> anyhow::Result<()> {
    let report = result.unwrap_or_else(|e| exit_with(&e));

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Err(e) = report.ensure_passed() {
        std::process::exit(e.exit_code());
    }
    Ok(())
}

fn print_report(report: &GateReport) {
    let label = match report.decision {
        GateDecision::Skip => "SKIP".yellow().bold(),
        GateDecision::Pass | GateDecision::ImprovedLocal => "OK".green().bold(),
        GateDecision::ImprovedCi | GateDecision::Regressed => "FAIL".red().bold(),
    };
    println!("{} [{}] {}", label, report.gate, report.summary);

    if report.failures.len() > 1 {
        for failure in &report.failures {
            println!("    {}", failure);
        }
    }
}

fn exit_with(e: &RatchetError) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), e);
    std::process::exit(e.exit_code());
}
