mod config;
mod llm;
mod output;
mod parse;
mod prompt;
mod store;

use clap::Parser;
use fundrank_core::constants::{
    DEFAULT_EXPONENT, DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_APPEARANCES, DEFAULT_PRIOR_STRENGTH,
    DEFAULT_TOLERANCE, RANK_TIE_TOLERANCE,
};
use fundrank_core::{
    evaluate, plan_pairs, AllocationOptions, EvalOptions, FitOptions, IdMap, Item, Ledger,
    PlanOptions, TiePolicy,
};
use rand::Rng;
use reqwest::Client;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::FundrankConfig;
use crate::llm::{judge_pair, LlmConfig, RetryPolicy};
use crate::store::RecordedOutcome;

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(
    name = "fundrank",
    version,
    about = "Rank funding applications with LLM pairwise comparisons and allocate a fixed budget"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Judge pairs against the LLM, then fit, rank, and allocate end to end
    Run(RunArgs),
    /// Re-fit and allocate from a saved comparisons CSV; no LLM calls
    Score(ScoreArgs),
    /// Create a default config file at ~/.config/fundrank/config.toml
    Init,
}

#[derive(clap::Args)]
struct FitFlags {
    /// Ghost-opponent regularization prior strength (0 disables)
    #[arg(long)]
    prior: Option<f64>,

    /// Convergence tolerance for the fitter
    #[arg(long)]
    tolerance: Option<f64>,

    /// Iteration cap for the fitter
    #[arg(long)]
    max_iterations: Option<usize>,

    /// How ties enter the fit: "half-win" or "ignore"
    #[arg(long)]
    tie_policy: Option<String>,
}

#[derive(clap::Args)]
struct BudgetFlags {
    /// Total budget to allocate, in integer units
    #[arg(long)]
    budget: Option<u64>,

    /// Zipf exponent s (> 0); larger skews harder toward the top ranks
    #[arg(long)]
    exponent: Option<f64>,

    /// Allocate only to the best N ranks; everyone below gets zero
    #[arg(long)]
    top_n: Option<usize>,
}

#[derive(clap::Args)]
struct OutputFlags {
    /// Output JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Output a CSV leaderboard instead of a table
    #[arg(long)]
    csv: bool,

    /// Show progress during execution
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser)]
struct RunArgs {
    /// The comparison criterion (e.g. "Which project was more impactful?")
    #[arg(long)]
    criterion: String,

    /// Items file: JSON array of {"id", "label"} objects, JSON array of
    /// strings, or plain text with one item per line
    #[arg(long)]
    items: Option<PathBuf>,

    /// Inline item (repeatable)
    #[arg(long = "item")]
    inline_items: Vec<String>,

    /// OpenAI-compatible base URL (e.g. http://localhost:8000)
    #[arg(long)]
    endpoint: Option<String>,

    /// Bearer token for the API (also reads OPENAI_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Model ID for the API
    #[arg(long)]
    model: Option<String>,

    /// Target number of comparisons (default: 4 per item)
    #[arg(long)]
    comparisons: Option<usize>,

    /// Minimum number of pairs every item appears in
    #[arg(long)]
    min_appearances: Option<usize>,

    /// Allow judging the same pair more than once (noise averaging)
    #[arg(long)]
    allow_repeats: bool,

    /// Max concurrent LLM requests
    #[arg(long)]
    concurrency: Option<usize>,

    /// RNG seed for a reproducible comparison schedule
    #[arg(long)]
    seed: Option<u64>,

    /// Max retries per comparison on HTTP errors. Set to 0 to disable.
    #[arg(long)]
    retries: Option<usize>,

    /// Initial retry backoff in milliseconds; doubles per attempt, capped at 30s
    #[arg(long)]
    backoff_ms: Option<u64>,

    /// LLM sampling temperature
    #[arg(long)]
    temperature: Option<f64>,

    /// Path to a custom prompt template file.
    /// The template must contain: $criterion, $first, $second
    #[arg(long)]
    prompt_template: Option<PathBuf>,

    /// Append every verdict to this CSV file as it arrives (audit trail,
    /// also the input format for `fundrank score`)
    #[arg(long)]
    save_comparisons: Option<PathBuf>,

    #[command(flatten)]
    fit: FitFlags,

    #[command(flatten)]
    budget: BudgetFlags,

    #[command(flatten)]
    output: OutputFlags,

    /// Path to config file (default: ~/.config/fundrank/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser)]
struct ScoreArgs {
    /// Comparisons CSV produced by `run --save-comparisons`
    #[arg(long)]
    comparisons: PathBuf,

    /// Optional items file; defaults to the items found in the CSV, in
    /// first-appearance order
    #[arg(long)]
    items: Option<PathBuf>,

    #[command(flatten)]
    fit: FitFlags,

    #[command(flatten)]
    budget: BudgetFlags,

    #[command(flatten)]
    output: OutputFlags,

    /// Path to config file (default: ~/.config/fundrank/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(serde::Deserialize)]
struct ItemSpec {
    id: String,
    #[serde(default)]
    label: Option<String>,
}

/// Parse items from a string: JSON array of {id, label} objects, JSON array
/// of strings, or plain text one per line.
fn parse_items_from_str(content: &str) -> Vec<Item> {
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        if let Ok(specs) = serde_json::from_str::<Vec<ItemSpec>>(trimmed) {
            return specs
                .into_iter()
                .filter(|s| !s.id.trim().is_empty())
                .map(|s| match s.label {
                    Some(label) => Item::new(s.id, label),
                    None => Item::bare(s.id),
                })
                .collect();
        }
        let ids: Vec<String> = serde_json::from_str(trimmed)
            .unwrap_or_else(|e| bail(format!("File looks like JSON but failed to parse: {e}")));
        ids.into_iter().filter(|s| !s.trim().is_empty()).map(Item::bare).collect()
    } else {
        trimmed
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Item::bare)
            .collect()
    }
}

/// Load items from all sources: --items file, --item inline args, or stdin.
fn load_items(items_path: &Option<PathBuf>, inline_items: &[String]) -> Vec<Item> {
    let mut items = Vec::new();

    if let Some(path) = items_path {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| bail(format!("Failed to read items file {}: {e}", path.display())));
        items = parse_items_from_str(&content);
    }

    items.extend(inline_items.iter().map(Item::bare));

    if items.is_empty() {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            bail("No items provided. Use --items <file>, --item <name>, or pipe items via stdin.");
        }
        let content: String = stdin
            .lock()
            .lines()
            .map(|l| l.unwrap_or_else(|e| bail(format!("Failed to read from stdin: {e}"))))
            .collect::<Vec<_>>()
            .join("\n");
        items = parse_items_from_str(&content);
    }

    if items.len() < 2 {
        bail(format!("Need at least 2 items to rank, got {}", items.len()));
    }
    items
}

fn build_eval_options(
    fit: &FitFlags,
    budget: &BudgetFlags,
    cfg: &FundrankConfig,
    config_path: &Path,
) -> EvalOptions {
    let budget_units = budget.budget.or(cfg.budget).unwrap_or_else(|| {
        bail(format!(
            "No budget specified. Pass --budget or set it in {}",
            config_path.display()
        ));
    });

    let tie_policy = match fit.tie_policy.as_deref() {
        Some("half-win") | None => TiePolicy::HalfWin,
        Some("ignore") => TiePolicy::Ignore,
        Some(other) => bail(format!("Unknown tie policy {other:?}. Use \"half-win\" or \"ignore\".")),
    };

    EvalOptions {
        fit: FitOptions {
            max_iterations: fit.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            tolerance: fit.tolerance.unwrap_or(DEFAULT_TOLERANCE),
            prior_strength: fit.prior.unwrap_or(DEFAULT_PRIOR_STRENGTH),
            tie_policy,
        },
        allocation: AllocationOptions {
            budget: budget_units,
            exponent: budget.exponent.or(cfg.exponent).unwrap_or(DEFAULT_EXPONENT),
            top_n: budget.top_n.or(cfg.top_n),
        },
        rank_tolerance: RANK_TIE_TOLERANCE,
    }
}

fn print_report(report: &fundrank_core::RankingReport, flags: &OutputFlags) {
    output::report_warnings(report);
    if flags.json {
        output::print_json(report);
    } else if flags.csv {
        output::print_csv(report);
    } else {
        output::print_table(report);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_rank(args).await,
        Commands::Score(args) => run_score(args),
        Commands::Init => {
            let path = config::create_default_config();
            println!("Created config at {}", path.display());
            println!("Edit it to set your default endpoint, model, budget, etc.");
        }
    }
}

/// Outcome of one spawned oracle task, for the end-of-run tally.
enum TaskResult {
    Judged,
    Unparseable,
    Failed(String),
    Skipped,
}

async fn run_rank(args: RunArgs) {
    // Load config file, merge with CLI args (CLI wins)
    let config_path = args.config.clone().unwrap_or_else(config::config_path);
    let cfg = config::load_config(&config_path);

    let endpoint = args.endpoint.clone().or(cfg.endpoint.clone()).unwrap_or_else(|| {
        bail(format!("No endpoint specified. Pass --endpoint or set it in {}", config_path.display()));
    });
    let model = args.model.clone().or(cfg.model.clone()).unwrap_or_else(|| {
        bail(format!("No model specified. Pass --model or set it in {}", config_path.display()));
    });
    let concurrency = args.concurrency.or(cfg.concurrency).unwrap_or(16);
    if concurrency == 0 {
        bail(fundrank_core::ConfigError::ZeroConcurrency);
    }

    let items = load_items(&args.items, &args.inline_items);
    let num_items = items.len();

    if let Err(e) = IdMap::from_items(&items) {
        bail(e);
    }
    if args.save_comparisons.is_some() {
        for item in &items {
            if let Err(e) = store::check_id(&item.id) {
                bail(e);
            }
        }
    }

    // All configuration is validated before the first oracle call.
    let eval_options = build_eval_options(&args.fit, &args.budget, &cfg, &config_path);
    if let Err(e) = eval_options.validate() {
        bail(e);
    }

    let seed = args.seed.or(cfg.seed).unwrap_or_else(|| rand::rng().random());
    let plan_options = PlanOptions {
        target_comparisons: args.comparisons.or(cfg.comparisons).unwrap_or(num_items * 4),
        min_appearances: args.min_appearances.unwrap_or(DEFAULT_MIN_APPEARANCES),
        allow_repeats: args.allow_repeats,
        seed,
    };
    let plan = match plan_pairs(num_items, &plan_options) {
        Ok(plan) => plan,
        Err(e) => bail(e),
    };

    if args.output.verbose {
        eprintln!(
            "Judging {} pairs across {} items (seed {seed}, concurrency {concurrency})",
            plan.len(),
            num_items,
        );
        eprintln!("Criterion: \"{}\"", args.criterion);
        eprintln!("Endpoint: {endpoint} | Model: {model}");
    }

    // Load prompt template: CLI arg > config file > built-in default
    let template = {
        let template_path =
            args.prompt_template.clone().or_else(|| cfg.prompt_template.clone().map(PathBuf::from));
        match template_path {
            Some(path) => prompt::load_template(&path),
            None => prompt::DEFAULT_TEMPLATE.to_string(),
        }
    };

    let api_key = args.api_key.clone().or_else(|| std::env::var("OPENAI_API_KEY").ok());
    let llm_config = Arc::new(LlmConfig {
        endpoint,
        model,
        api_key,
        temperature: args.temperature.unwrap_or(0.3),
    });
    let retry = Arc::new(RetryPolicy {
        max_retries: args.retries.unwrap_or(3),
        initial_backoff: Duration::from_millis(args.backoff_ms.unwrap_or(500)),
    });
    let template = Arc::new(template);
    let labels: Arc<Vec<String>> = Arc::new(items.iter().map(|i| i.label.clone()).collect());
    let ids: Arc<Vec<String>> = Arc::new(items.iter().map(|i| i.id.clone()).collect());
    let client = Client::new();

    // The single synchronized mutation point for verdict folding.
    let ledger = Arc::new(Mutex::new(Ledger::new(num_items)));

    let save_file: Option<Arc<Mutex<std::fs::File>>> = args.save_comparisons.as_ref().map(|path| {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap_or_else(|e| bail(format!("Failed to open {}: {e}", path.display())));
        let _ = writeln!(file, "{}", store::CSV_HEADER);
        Arc::new(Mutex::new(file))
    });

    // On interrupt, stop issuing oracle calls and score the fold-so-far
    // ledger; per-verdict folds mean it is never left half-updated.
    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = cancelled.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted; scoring the verdicts collected so far");
                cancelled.store(true, Ordering::SeqCst);
            }
        });
    }

    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
    let mut handles = Vec::with_capacity(plan.len());

    for (first, second) in plan {
        let sem = semaphore.clone();
        let client = client.clone();
        let llm_config = llm_config.clone();
        let retry = retry.clone();
        let template = template.clone();
        let labels = labels.clone();
        let ids = ids.clone();
        let ledger = ledger.clone();
        let save_file = save_file.clone();
        let cancelled = cancelled.clone();
        let criterion = args.criterion.clone();
        let verbose = args.output.verbose;

        let handle = tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            if cancelled.load(Ordering::SeqCst) {
                return TaskResult::Skipped;
            }

            let verdict = judge_pair(
                &client,
                &llm_config,
                &template,
                &criterion,
                &labels[first],
                &labels[second],
                &retry,
                verbose,
            )
            .await;

            let (recorded, result) = match verdict {
                Ok(Some(outcome)) => (RecordedOutcome::Decided(outcome), TaskResult::Judged),
                Ok(None) => (RecordedOutcome::Undecided, TaskResult::Unparseable),
                Err(e) => (RecordedOutcome::Undecided, TaskResult::Failed(e)),
            };

            {
                let mut ledger = ledger.lock().unwrap();
                match recorded {
                    RecordedOutcome::Decided(outcome) => ledger.record(first, second, outcome),
                    RecordedOutcome::Undecided => ledger.record_undecided(first, second),
                }
            }

            if let Some(ref file_mutex) = save_file {
                let row = store::format_row(&ids[first], &ids[second], recorded);
                let mut f = file_mutex.lock().unwrap();
                let _ = writeln!(f, "{row}");
                let _ = f.flush();
            }

            result
        });

        handles.push(handle);
    }

    let mut judged = 0usize;
    let mut unparseable = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;

    for handle in handles {
        match handle.await {
            Ok(TaskResult::Judged) => judged += 1,
            Ok(TaskResult::Unparseable) => {
                unparseable += 1;
                if args.output.verbose {
                    eprintln!("  Warning: unparseable verdict, pair recorded as undecided");
                }
            }
            Ok(TaskResult::Failed(e)) => {
                failed += 1;
                if args.output.verbose {
                    eprintln!("  Error (after exhausting {} retries): {e}", retry.max_retries);
                }
            }
            Ok(TaskResult::Skipped) => skipped += 1,
            Err(e) => {
                failed += 1;
                if args.output.verbose {
                    eprintln!("  Task panicked: {e}");
                }
            }
        }
    }

    if args.output.verbose {
        eprintln!("Verdicts: {judged} judged, {unparseable} unparseable, {failed} failed, {skipped} skipped");
    }

    if judged == 0 && !cancelled.load(Ordering::SeqCst) {
        bail("All comparisons failed. No verdicts to score.");
    }

    let ledger = ledger.lock().unwrap();
    let report = match evaluate(&items, &ledger, &eval_options) {
        Ok(report) => report,
        Err(e) => bail(e),
    };
    print_report(&report, &args.output);
}

fn run_score(args: ScoreArgs) {
    let config_path = args.config.clone().unwrap_or_else(config::config_path);
    let cfg = config::load_config(&config_path);

    let eval_options = build_eval_options(&args.fit, &args.budget, &cfg, &config_path);
    if let Err(e) = eval_options.validate() {
        bail(e);
    }

    let content = std::fs::read_to_string(&args.comparisons).unwrap_or_else(|e| {
        bail(format!("Failed to read comparisons file {}: {e}", args.comparisons.display()))
    });
    let rows = store::load_comparisons(&content).unwrap_or_else(|e| bail(e));
    if rows.is_empty() {
        bail(format!("No comparison data found in {}", args.comparisons.display()));
    }

    let items = match &args.items {
        Some(path) => {
            let content = std::fs::read_to_string(path).unwrap_or_else(|e| {
                bail(format!("Failed to read items file {}: {e}", path.display()))
            });
            parse_items_from_str(&content)
        }
        None => store::items_from_rows(&rows),
    };

    let id_map = match IdMap::from_items(&items) {
        Ok(map) => map,
        Err(e) => bail(e),
    };
    let ledger = store::ledger_from_rows(&rows, &id_map).unwrap_or_else(|e| bail(e));

    let report = match evaluate(&items, &ledger, &eval_options) {
        Ok(report) => report,
        Err(e) => bail(e),
    };
    print_report(&report, &args.output);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items_plain_lines() {
        let items = parse_items_from_str("alpha\n  beta \n\ngamma\n");
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta", "gamma"]);
        assert_eq!(items[1].label, "beta");
    }

    #[test]
    fn test_parse_items_json_strings() {
        let items = parse_items_from_str(r#"["alpha", "beta"]"#);
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_parse_items_json_objects() {
        let items = parse_items_from_str(
            r#"[{"id": "p1", "label": "Project One"}, {"id": "p2"}]"#,
        );
        assert_eq!(items[0].label, "Project One");
        assert_eq!(items[1].label, "p2");
    }
}
