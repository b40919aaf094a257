//! Shortflow CLI - run Shortcuts automation pipelines

use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use shortflow::error::{FixSuggestion, FlowError};
use shortflow::{
    create_executor, Context, ProgressEvent, RunStatus, Runner, ShortcutStore, ShortcutsExecutor,
    StepExecutor, StepOutput, Workflow, WorkflowStore,
};

#[derive(Parser)]
#[command(name = "shortflow")]
#[command(about = "Pipeline engine for Shortcuts automation workflows")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow file and stream progress
    Run {
        /// Path to a workflow .json file
        file: String,

        /// Initial input text, exposed to steps as {{user_input}}
        #[arg(short, long, default_value = "")]
        input: String,

        /// Executor to use (shortcuts, mock)
        #[arg(short, long, default_value = "shortcuts")]
        executor: String,

        /// Print raw SSE frames (data: <json>) instead of formatted progress
        #[arg(long)]
        sse: bool,
    },

    /// Run a single shortcut with input text and print its output
    RunShortcut {
        /// Shortcut name, as shown by `shortflow shortcuts`
        name: String,

        /// Input text, exposed to the shortcut as {{user_input}}
        #[arg(short, long, default_value = "")]
        input: String,

        /// Executor to use (shortcuts, mock)
        #[arg(short, long, default_value = "shortcuts")]
        executor: String,
    },

    /// Validate a workflow file (parse + shape checks)
    Validate {
        /// Path to a workflow .json file
        file: String,
    },

    /// List the shortcuts installed on this machine
    Shortcuts,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            file,
            input,
            executor,
            sse,
        } => run_workflow(&file, &input, &executor, sse).await,
        Commands::RunShortcut {
            name,
            input,
            executor,
        } => run_shortcut(&name, &input, &executor).await,
        Commands::Validate { file } => validate_workflow(&file),
        Commands::Shortcuts => list_shortcuts().await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn run_workflow(
    file: &str,
    input: &str,
    executor_name: &str,
    sse: bool,
) -> Result<(), FlowError> {
    // Read and parse (async to not block runtime)
    let json = tokio::fs::read_to_string(file).await?;
    let workflow = Workflow::from_json(&json)?;

    // Runs go through the registry, keyed by the definition's own id
    let store = WorkflowStore::new();
    let id = workflow.id.clone();
    store.save(workflow);
    let workflow = store.load(&id)?;

    let executor: Arc<dyn StepExecutor> = Arc::from(create_executor(executor_name)?);
    if !executor.is_available() {
        eprintln!(
            "{} executor '{}' is not available on this machine",
            "!".yellow(),
            executor.name()
        );
    }

    if !sse {
        println!(
            "{} Running '{}' ({} steps) with the {} executor\n",
            "→".cyan(),
            workflow.name.cyan().bold(),
            workflow.total_steps(),
            executor.name()
        );
    }

    let runner = Runner::new(executor);
    let mut handle = runner.run((*workflow).clone(), Context::from_input(input));

    while let Some(event) = handle.next_event().await {
        if sse {
            print!("{}", event.to_sse());
        } else {
            print_event(&event);
        }
    }

    let ctx = handle.into_result().await?;
    if !sse {
        if let Some(output) = ctx.previous_output() {
            println!("\n{}", "Output:".cyan().bold());
            println!("{output}");
        }
    }

    Ok(())
}

fn print_event(event: &ProgressEvent) {
    match event.status {
        RunStatus::Running => println!(
            "  {} [{}/{}] {}",
            "[⟳]".yellow(),
            event.step,
            event.total,
            event.message.as_deref().unwrap_or("running").dimmed()
        ),
        RunStatus::Output => match &event.output {
            Some(StepOutput::Text(text)) => println!(
                "  {} [{}/{}] {}",
                "✓".green(),
                event.step,
                event.total,
                preview(text)
            ),
            Some(StepOutput::Many(outputs)) => println!(
                "  {} [{}/{}] {} branch outputs collected",
                "✓".green(),
                event.step,
                event.total,
                outputs.len()
            ),
            None => {}
        },
        RunStatus::Error => println!(
            "  {} [{}/{}] {}",
            "✗".red(),
            event.step,
            event.total,
            event.message.as_deref().unwrap_or("failed").red()
        ),
        RunStatus::Completed => println!("\n{} Done!", "✓".green()),
    }
}

/// First line of a step output, clipped for terminal display
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > 100 {
        let clipped: String = line.chars().take(100).collect();
        format!("{clipped}...")
    } else {
        line.to_string()
    }
}

async fn run_shortcut(name: &str, input: &str, executor_name: &str) -> Result<(), FlowError> {
    let executor: Arc<dyn StepExecutor> = Arc::from(create_executor(executor_name)?);
    let output = executor
        .execute(name, &Context::from_input(input))
        .await
        .map_err(|e| FlowError::Executor {
            step: name.to_string(),
            detail: e.to_string(),
        })?;
    println!("{output}");
    Ok(())
}

fn validate_workflow(file: &str) -> Result<(), FlowError> {
    let json = std::fs::read_to_string(file)?;
    let workflow = Workflow::from_json(&json)?;
    workflow.validate()?;

    println!("{} Workflow '{}' is valid", "✓".green(), workflow.name);
    println!("  Steps: {}", workflow.steps.len());
    println!("  Leaf steps: {}", workflow.total_steps());

    Ok(())
}

async fn list_shortcuts() -> Result<(), FlowError> {
    let executor = ShortcutsExecutor::new();
    let names = executor.list().await.map_err(|e| FlowError::Executor {
        step: "shortcuts list".to_string(),
        detail: e.to_string(),
    })?;

    let store = ShortcutStore::new();
    let refreshed = store.refresh(names);

    println!("{} {} shortcuts installed", "→".cyan(), refreshed.len());
    for shortcut in store.list() {
        println!("  {} {}", "•".cyan(), shortcut.name);
    }

    Ok(())
}
