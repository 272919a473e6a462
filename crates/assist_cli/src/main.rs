use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use assist_core::{
    evaluate_cases, faq, load_entries_jsonl, load_pairs_jsonl, load_profiles_json,
    load_smalltalk_json, recommend, sample_profiles, save_entries_jsonl, EmbeddingProvider,
    EvalCase, FaqEntry, HashEmbeddingProvider, MiniLmEmbeddingProvider, Resolver, ResolverConfig,
    SmallTalkTable, DEFAULT_REQUIRED_PASS_RATE, DEFAULT_SIMILARITY_THRESHOLD,
};

#[derive(Debug, Parser)]
#[command(name = "assist")]
#[command(about = "Student-platform FAQ assistant CLI")]
struct Cli {
    /// Path to the all-MiniLM-L6-v2 .safetensors file. When provided with
    /// --tokenizer-path, uses neural embeddings; otherwise a deterministic
    /// hash embedder is used.
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    /// Path to the matching tokenizer.json. Required when --model-path is set.
    #[arg(long, global = true)]
    tokenizer_path: Option<PathBuf>,

    /// Small-talk table JSON; defaults to the built-in table.
    #[arg(long, global = true)]
    smalltalk: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Embed a JSONL file of {"question", "answer"} pairs into an index file.
    BuildIndex {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Resolve a single utterance and print the reply with diagnostics.
    Query {
        /// Precomputed index; defaults to embedding the built-in FAQ.
        #[arg(long)]
        index: Option<PathBuf>,
        #[arg(long)]
        question: String,
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f32,
    },
    /// Interactive chat loop; "exit", "quit" or "bye" ends the session.
    Chat {
        #[arg(long)]
        index: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f32,
    },
    /// Run regression cases against the resolver.
    Eval {
        #[arg(long)]
        index: Option<PathBuf>,
        #[arg(long)]
        cases: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f32,
        #[arg(long, default_value_t = DEFAULT_REQUIRED_PASS_RATE)]
        min_pass_rate: f32,
    },
    /// Recommend similar student profiles by TF-IDF overlap.
    Recommend {
        /// Profiles JSON; defaults to the sample cohort.
        #[arg(long)]
        profiles: Option<PathBuf>,
        #[arg(long)]
        id: String,
        #[arg(long, default_value_t = 3)]
        top: usize,
    },
}

fn make_embedder(cli: &Cli) -> Result<Box<dyn EmbeddingProvider>> {
    match (&cli.model_path, &cli.tokenizer_path) {
        (Some(model), Some(tokenizer)) => {
            eprintln!("Loading model from {} ...", model.display());
            let provider = MiniLmEmbeddingProvider::load(model, tokenizer)?;
            eprintln!("Model loaded.");
            Ok(Box::new(provider))
        }
        (None, None) => Ok(Box::new(HashEmbeddingProvider::default())),
        _ => bail!("--model-path and --tokenizer-path must both be provided"),
    }
}

fn load_smalltalk(cli: &Cli) -> Result<SmallTalkTable> {
    match &cli.smalltalk {
        Some(path) => load_smalltalk_json(path),
        None => Ok(SmallTalkTable::builtin()),
    }
}

/// Builds the resolver from a precomputed index when one is given, otherwise
/// from the built-in FAQ embedded on the spot.
fn load_resolver(
    cli: &Cli,
    index: Option<&Path>,
    threshold: f32,
) -> Result<Resolver<Box<dyn EmbeddingProvider>>> {
    let embedder = make_embedder(cli)?;
    let smalltalk = load_smalltalk(cli)?;
    let config = ResolverConfig {
        similarity_threshold: threshold,
        ..ResolverConfig::default()
    };

    match index {
        Some(path) => {
            let entries = load_entries_jsonl(path)?;
            Resolver::from_entries(entries, smalltalk, embedder, config)
        }
        None => Resolver::build(faq::builtin(), smalltalk, embedder, config),
    }
}

fn model_name(cli: &Cli) -> String {
    cli.model_path
        .as_ref()
        .map(|p| {
            p.file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        })
        .unwrap_or_else(|| "hash".to_string())
}

fn read_eval_cases_json(path: &Path) -> Result<Vec<EvalCase>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(file).context("parse eval cases json")
}

fn run_chat(resolver: &Resolver<Box<dyn EmbeddingProvider>>) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    write!(stdout, "You: ")?;
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line.context("read input line")?;
        if matches!(line.trim().to_lowercase().as_str(), "exit" | "quit" | "bye") {
            println!("Bot: Goodbye! 👋");
            return Ok(());
        }

        let reply = resolver.resolve(&line)?;
        println!("Bot: {reply}");

        write!(stdout, "You: ")?;
        stdout.flush()?;
    }

    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let model = model_name(&cli);

    match &cli.command {
        Commands::BuildIndex { input, output } => {
            let embedder = make_embedder(&cli)?;
            let pairs = load_pairs_jsonl(input)?;
            let now = chrono::Utc::now();

            let mut entries = Vec::with_capacity(pairs.len());
            for pair in pairs {
                entries.push(FaqEntry {
                    embedding: embedder
                        .embed(&pair.question)
                        .with_context(|| format!("embed question {:?}", pair.question))?,
                    question: pair.question,
                    answer: pair.answer,
                    created_at: now,
                });
            }

            save_entries_jsonl(output, &entries)?;
            println!(
                "model={} indexed_entries={} output={}",
                model,
                entries.len(),
                output.display()
            );
        }
        Commands::Query {
            index,
            question,
            threshold,
        } => {
            let resolver = load_resolver(&cli, index.as_deref(), *threshold)?;
            let res = resolver.resolve_detailed(question)?;

            println!(
                "model={} outcome={:?} position={} score={}",
                model,
                res.outcome,
                res.position.map_or("null".to_string(), |p| p.to_string()),
                res.score.map_or("null".to_string(), |s| format!("{s:.4}")),
            );
            println!("reply={}", res.reply);
        }
        Commands::Chat { index, threshold } => {
            let resolver = load_resolver(&cli, index.as_deref(), *threshold)?;
            run_chat(&resolver)?;
        }
        Commands::Eval {
            index,
            cases,
            threshold,
            min_pass_rate,
        } => {
            let resolver = load_resolver(&cli, index.as_deref(), *threshold)?;
            let cases = read_eval_cases_json(cases)?;
            let summary = evaluate_cases(&resolver, &cases)?;

            println!(
                "model={} total={} passed={} failed={} pass_rate={:.4} required={:.4} meets_threshold={}",
                model,
                summary.total,
                summary.passed,
                summary.failed,
                summary.pass_rate,
                min_pass_rate,
                summary.pass_rate >= *min_pass_rate
            );
            for o in &summary.outcomes {
                println!(
                    "case={} passed={} outcome={:?} position={} score={} latency={:.1}ms",
                    o.case_id,
                    o.passed,
                    o.actual_outcome,
                    o.actual_position.map_or("null".to_string(), |p| p.to_string()),
                    o.score.map_or("null".to_string(), |s| format!("{s:.4}")),
                    o.latency_ms
                );
            }

            if summary.pass_rate < *min_pass_rate {
                bail!(
                    "pass rate {:.4} below required {:.4}",
                    summary.pass_rate,
                    min_pass_rate
                );
            }
        }
        Commands::Recommend { profiles, id, top } => {
            let cohort = match profiles {
                Some(path) => load_profiles_json(path)?,
                None => sample_profiles(),
            };
            let Some(recs) = recommend(&cohort, id, *top) else {
                bail!("profile {id:?} not found");
            };

            for rec in recs {
                println!("{} {} {:.2}", rec.id, rec.name, rec.score);
            }
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
