//! NavGate CLI
//!
//! CLI tool for checking URLs against allow/deny settings and validating
//! rule lists.

mod bench;
mod load;

use std::path::Path;

use clap::{Args, Parser, Subcommand};

use ng_compiler::{explain_pattern, format_rule_list, Settings};
use ng_core::{DecideOptions, Decision, RuleOutcome, TraceStep};

use crate::load::{load_policy, write_text, PolicySource};

#[derive(Parser)]
#[command(name = "ng-cli")]
#[command(about = "NavGate URL policy checker and tools")]
struct Cli {
    /// Log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct PolicyArgs {
    /// Settings JSON file
    #[arg(short, long)]
    settings: Option<String>,

    /// Extra allow rules, one per line
    #[arg(long = "allow")]
    allow_files: Vec<String>,

    /// Extra deny rules, one per line
    #[arg(long = "deny")]
    deny_files: Vec<String>,

    /// Override the settings mode (blacklist, whitelist, combined)
    #[arg(short, long)]
    mode: Option<String>,
}

impl From<PolicyArgs> for PolicySource {
    fn from(args: PolicyArgs) -> Self {
        Self {
            settings: args.settings,
            allow_files: args.allow_files,
            deny_files: args.deny_files,
            mode: args.mode,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether URLs are blocked
    Check {
        #[command(flatten)]
        policy: PolicyArgs,

        /// URLs to check
        #[arg(required = true)]
        urls: Vec<String>,

        /// Hosts treated as temporarily allowed
        #[arg(long = "temp-allow")]
        temp_allow: Vec<String>,

        /// Print decisions as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Compile the policy and report rejected rules
    Validate {
        #[command(flatten)]
        policy: PolicyArgs,

        /// Fail when any rule is rejected
        #[arg(long)]
        strict: bool,
    },

    /// Show how URLs are evaluated, or how patterns are understood
    Explain {
        #[command(flatten)]
        policy: PolicyArgs,

        /// URLs, or patterns with --pattern
        #[arg(required = true)]
        targets: Vec<String>,

        /// Treat targets as patterns instead of URLs
        #[arg(short, long)]
        pattern: bool,
    },

    /// Write the rule lists of a settings file as plain text
    Export {
        /// Settings JSON file
        #[arg(short, long)]
        settings: String,

        /// Output file for allow rules
        #[arg(long, default_value = "allow.txt")]
        allow_out: String,

        /// Output file for deny rules
        #[arg(long, default_value = "deny.txt")]
        deny_out: String,
    },

    /// Time decide() over a URL list
    Bench {
        #[command(flatten)]
        policy: PolicyArgs,

        /// URL file, one per line (defaults to a built-in mix)
        #[arg(short, long)]
        urls: Option<String>,

        #[arg(long, default_value_t = 1000)]
        iterations: usize,

        #[arg(long, default_value_t = 10_000)]
        warmup_ops: usize,

        #[arg(long, default_value_t = 256)]
        sample_batch_ops: usize,

        /// Collect a trace on every call
        #[arg(long)]
        trace: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            policy,
            urls,
            temp_allow,
            json,
        } => cmd_check(policy.into(), &urls, &temp_allow, json),
        Commands::Validate { policy, strict } => cmd_validate(policy.into(), strict),
        Commands::Explain {
            policy,
            targets,
            pattern,
        } => {
            if pattern {
                cmd_explain_patterns(&targets)
            } else {
                cmd_explain_urls(policy.into(), &targets)
            }
        }
        Commands::Export {
            settings,
            allow_out,
            deny_out,
        } => cmd_export(&settings, &allow_out, &deny_out),
        Commands::Bench {
            policy,
            urls,
            iterations,
            warmup_ops,
            sample_batch_ops,
            trace,
        } => bench::run(bench::BenchOptions {
            source: policy.into(),
            urls_path: urls,
            iterations,
            warmup_ops,
            sample_batch_ops,
            trace,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_check(source: PolicySource, urls: &[String], temp_allow: &[String], json: bool) -> Result<(), String> {
    let (compiled, _) = load_policy(&source, false)?;
    let snapshot = compiled.snapshot;
    let temp = |host: &str| temp_allow.iter().any(|allowed| allowed.eq_ignore_ascii_case(host));

    for url in urls {
        let decision = snapshot.decide(url, &temp, DecideOptions::default());
        if json {
            let line = serde_json::to_string(&decision).map_err(|e| format!("Failed to encode decision: {e}"))?;
            println!("{line}");
        } else {
            println!("{}", format_decision(url, &decision));
        }
    }

    Ok(())
}

fn cmd_validate(source: PolicySource, strict: bool) -> Result<(), String> {
    let (compiled, stats) = load_policy(&source, true)?;
    let diagnostics = compiled.snapshot.index.diagnostics();

    println!("Policy is {}", if diagnostics.is_empty() { "valid" } else { "usable with rejected rules" });
    println!("  Mode:        {}", compiled.snapshot.mode.as_str());
    println!("  Allow rules: {} -> {}", stats.allow_rules, compiled.snapshot.index.allow().len());
    println!("  Deny rules:  {} -> {}", stats.deny_rules, compiled.snapshot.index.deny().len());
    println!("  Deduped:     {}", compiled.stats.deduped);
    println!("  Invalid:     {}", compiled.stats.invalid);
    println!(
        "  Keywords:    {} allow, {} deny",
        compiled.snapshot.allow_keywords.len(),
        compiled.snapshot.deny_keywords.len()
    );
    println!("  Time:        {:.1}ms", stats.total_ms);

    for diagnostic in diagnostics {
        println!(
            "  {} #{}: \"{}\": {}",
            diagnostic.list.as_str(),
            diagnostic.position,
            diagnostic.raw,
            diagnostic.error
        );
    }

    if strict && !diagnostics.is_empty() {
        return Err(format!("{} rule(s) rejected", diagnostics.len()));
    }
    Ok(())
}

fn cmd_explain_urls(source: PolicySource, urls: &[String]) -> Result<(), String> {
    let (compiled, _) = load_policy(&source, false)?;
    let never = |_: &str| false;

    for url in urls {
        let decision = compiled.snapshot.decide(url, &never, DecideOptions { trace: true });
        println!("{}", format_decision(url, &decision));
        let Some(trace) = &decision.trace else {
            continue;
        };
        for step in &trace.steps {
            match step {
                TraceStep::Rule {
                    list,
                    position,
                    raw,
                    specificity,
                    outcome,
                } => println!(
                    "  {} #{position:<3} {:<18} {specificity:>3}  {raw}",
                    list.as_str(),
                    outcome_label(*outcome)
                ),
                TraceStep::Keyword { list, raw, matched } => println!(
                    "  {} keyword {:<14} \"{raw}\"",
                    list.as_str(),
                    if *matched { "matched" } else { "no match" }
                ),
            }
        }
    }

    Ok(())
}

fn cmd_explain_patterns(patterns: &[String]) -> Result<(), String> {
    for raw in patterns {
        let report = explain_pattern(raw);
        match (&report.normalized, &report.error) {
            (Some(normalized), _) => println!(
                "{raw}\n  normalized:  {normalized}\n  path:        {}\n  specificity: {}",
                report.path_kind.unwrap_or("none"),
                report.specificity
            ),
            (None, Some(error)) => println!("{raw}\n  invalid: {error}"),
            (None, None) => println!("{raw}\n  invalid"),
        }
    }
    Ok(())
}

fn cmd_export(settings_path: &str, allow_out: &str, deny_out: &str) -> Result<(), String> {
    let settings = Settings::load(Path::new(settings_path)).map_err(|e| e.to_string())?;

    write_text(Path::new(allow_out), &format_rule_list(&settings.allow_rules))?;
    write_text(Path::new(deny_out), &format_rule_list(&settings.deny_rules))?;

    println!(
        "Exported {} allow rules to '{}' and {} deny rules to '{}'",
        settings.allow_rules.len(),
        allow_out,
        settings.deny_rules.len(),
        deny_out
    );
    Ok(())
}

fn format_decision(url: &str, decision: &Decision) -> String {
    let verdict = if decision.blocked { "BLOCK" } else { "ALLOW" };
    format!("{verdict}  {url}  ({})", decision.reason)
}

fn outcome_label(outcome: RuleOutcome) -> &'static str {
    match outcome {
        RuleOutcome::Matched => "matched",
        RuleOutcome::ProtocolMismatch => "protocol mismatch",
        RuleOutcome::HostMismatch => "host mismatch",
        RuleOutcome::PathMismatch => "path mismatch",
        RuleOutcome::Invalid => "invalid rule",
        RuleOutcome::OpaqueUrl => "opaque url",
    }
}
