use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use arogya_agents::{HealthWorkflow, WorkflowConfig};
use arogya_core::{Intent, Slot, WorkflowOutput, WorkflowResult, WorkflowStatus};
use arogya_observability::{init_tracing, AppMetrics};
use arogya_providers::{Ports, ProviderConfig};
use arogya_retrieval::KnowledgeBaseSearch;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};

const MAX_HISTORY: usize = 20;
const CONTEXT_TURNS: usize = 5;

#[derive(Debug, Parser)]
#[command(name = "arogya")]
#[command(about = "Arogya health assistant CLI")]
struct Cli {
    /// Local knowledge base used when no web search key is configured.
    #[arg(long, env = "AROGYA_KB_ROOT")]
    kb_root: Option<PathBuf>,

    #[arg(long, env = "AROGYA_OPENAI_MODEL")]
    model: Option<String>,

    #[arg(long, env = "AROGYA_TEMPERATURE")]
    temperature: Option<f32>,

    #[arg(long, env = "AROGYA_SEARCH_MAX_RESULTS")]
    max_results: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session; the last turns are passed along as context.
    Chat,
    Ask {
        text: String,
        #[arg(long)]
        context: Option<String>,
    },
    Kb {
        #[command(subcommand)]
        command: KbCommand,
    },
}

#[derive(Debug, Subcommand)]
enum KbCommand {
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

#[derive(Debug, Clone)]
struct ChatTurn {
    query: String,
    intent: Option<Intent>,
    at: DateTime<Local>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("arogya_cli");
    let cli = Cli::parse();
    let config = provider_config(&cli);

    match cli.command {
        Command::Chat => run_chat(build_workflow(&config)?).await?,
        Command::Ask { text, context } => {
            let result = build_workflow(&config)?.run(&text, context).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Kb { command } => match command {
            KbCommand::Search { query, limit } => {
                let root = config.kb_root.clone().unwrap_or_else(|| PathBuf::from("kb"));
                let kb = KnowledgeBaseSearch::from_dir(&root).with_context(|| {
                    format!("failed loading knowledge base from {}", root.display())
                })?;
                println!("{}", serde_json::to_string_pretty(&kb.lookup(&query, limit))?);
            }
        },
    }

    Ok(())
}

fn provider_config(cli: &Cli) -> ProviderConfig {
    let mut config = ProviderConfig::from_env();
    if let Some(root) = cli.kb_root.clone() {
        config.kb_root = Some(root);
    }
    if let Some(model) = cli.model.clone() {
        config.openai_model = model;
    }
    if let Some(temperature) = cli.temperature {
        config.temperature = temperature.clamp(0.0, 2.0);
    }
    if let Some(max_results) = cli.max_results {
        config.search_max_results = max_results;
    }
    config
}

fn build_workflow(config: &ProviderConfig) -> Result<HealthWorkflow> {
    let ports = Ports::from_config(config)?;
    Ok(HealthWorkflow::new(
        ports.generation,
        ports.search,
        WorkflowConfig {
            search_max_results: config.search_max_results,
            ..WorkflowConfig::default()
        },
        AppMetrics::shared(),
    ))
}

async fn run_chat(workflow: HealthWorkflow) -> Result<()> {
    let mut history: Vec<ChatTurn> = Vec::new();

    println!("Arogya health assistant. Commands: 'history', 'clear', 'exit'.");
    println!("This is general information, not a diagnosis. In an emergency call 112.\n");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("clear") {
            history.clear();
            println!("History cleared.\n");
            continue;
        }
        if message.eq_ignore_ascii_case("history") {
            print_history(&history);
            continue;
        }

        match workflow.run(message, format_context(&history)).await {
            Ok(result) => {
                print!("{}", render_result(&result));
                history.push(ChatTurn {
                    query: message.to_string(),
                    intent: result.intent,
                    at: Local::now(),
                });
                if history.len() > MAX_HISTORY {
                    history.remove(0);
                }
            }
            Err(error) => eprintln!("error: {error}\n"),
        }
    }

    Ok(())
}

/// Prior turns as the workflow expects them; `None` before the first turn.
fn format_context(history: &[ChatTurn]) -> Option<String> {
    if history.is_empty() {
        return None;
    }

    let start = history.len().saturating_sub(CONTEXT_TURNS);
    let mut context = String::from("\n\nPrevious conversation:\n");
    for (idx, turn) in history[start..].iter().enumerate() {
        context.push_str(&format!(
            "{}. User: {}\n   Intent: {}\n",
            idx + 1,
            turn.query,
            turn.intent.map(Intent::as_label).unwrap_or("blocked")
        ));
    }
    Some(context)
}

fn print_history(history: &[ChatTurn]) {
    if history.is_empty() {
        println!("No conversation yet.\n");
        return;
    }
    for (idx, turn) in history.iter().enumerate() {
        println!(
            "{}. [{}] {} ({})",
            idx + 1,
            turn.at.format("%H:%M:%S"),
            turn.query,
            turn.intent.map(Intent::title).unwrap_or("Blocked")
        );
    }
    println!();
}

fn render_result(result: &WorkflowResult) -> String {
    let mut out = String::new();

    if result.status == WorkflowStatus::Blocked {
        out.push_str("\nI can't help with that request.\n");
        if let Some(reason) = result.reason.as_deref() {
            out.push_str(&format!("Reason: {reason}\n"));
        }
        out.push('\n');
        return out;
    }

    if let Some(intent) = result.intent {
        out.push_str(&format!("\n[{}]\n", intent.title()));
    }

    match &result.output {
        Slot::Filled(WorkflowOutput::Text(text)) => out.push_str(&format!("\n{text}\n")),
        Slot::Filled(WorkflowOutput::Symptom(outcome)) => {
            if outcome.emergency {
                out.push_str(&format!("\n!!! {} !!!\n", outcome.message));
            } else {
                out.push_str(&format!("\n{}\n", outcome.message));
            }
        }
        Slot::Degraded => out.push_str("\n(response unavailable)\n"),
        Slot::Absent => {}
    }

    match &result.symptom_assessment {
        Slot::Filled(assessment) => {
            out.push_str("\n== Symptom assessment ==\n");
            out.push_str(&format!("Symptoms: {}\n", assessment.symptoms.join(", ")));
            out.push_str(&format!("Severity: {}/10\n", assessment.severity));
            if let Some(duration) = assessment.duration.as_deref() {
                out.push_str(&format!("Duration: {duration}\n"));
            }
        }
        Slot::Degraded => out.push_str("\n== Symptom assessment ==\n(unavailable)\n"),
        Slot::Absent => {}
    }

    let sections = [
        ("Nearby hospitals", &result.hospital_locator),
        ("Emergency number", &result.emergency_number),
        ("Ayurvedic remedies", &result.ayurveda_recommendations),
        ("Yoga", &result.yoga_recommendations),
        ("General guidance", &result.general_guidance),
    ];
    for (title, slot) in sections {
        match slot {
            Slot::Filled(text) => out.push_str(&format!("\n== {title} ==\n{text}\n")),
            Slot::Degraded => out.push_str(&format!("\n== {title} ==\n(unavailable)\n")),
            Slot::Absent => {}
        }
    }

    for warning in &result.warnings {
        out.push_str(&format!("\nnote: {} {}\n", warning.field, warning.message));
    }

    out.push('\n');
    out
}
