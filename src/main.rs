//! Planwise - plan, execute and report on a task with a tool-calling LLM
//!
//! Main entry point for the CLI application.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use planwise::core::ProviderType;
use planwise::{Agent, Config};

/// Planwise - plan, execute and report on a task with a tool-calling LLM
#[derive(Parser, Debug)]
#[command(name = "planwise")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The task to carry out
    task: Option<String>,

    /// Model identifier
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Completion backend (openai, ollama)
    #[arg(long)]
    provider: Option<ProviderType>,

    /// Provider base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Re-plan after every completed step
    #[arg(long)]
    replan: bool,

    /// Workspace directory tools resolve paths against
    #[arg(long, short = 'w')]
    workspace: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Log full prompts and responses
    #[arg(long, short = 'd')]
    debug: bool,

    /// Write a default config file and exit
    #[arg(long)]
    init_config: bool,
}

fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = match args.config {
        Some(ref path) => {
            let _ = dotenvy::dotenv();
            Config::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => Config::load(),
    };

    // Apply CLI overrides
    if let Some(provider) = args.provider {
        config.llm.provider = provider;
    }

    if let Some(ref base_url) = args.base_url {
        config.llm.base_url = base_url.clone();
    }

    if let Some(ref model) = args.model {
        config.set_model(model.clone());
    }

    if let Some(ref workspace) = args.workspace {
        config.workspace.root = workspace.clone();
    }

    if args.replan {
        config.agent.replan_after_each_step = true;
    }

    if args.debug {
        config.agent.debug = true;
    }

    init_tracing(config.agent.debug);

    if args.init_config {
        let path = config.save().context("Failed to write config file")?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let Some(task) = args.task else {
        anyhow::bail!("No task given. Usage: planwise \"<task>\"");
    };

    let agent = Agent::from_config(&config).context("Failed to start agent")?;
    let state = agent.run(&task).await?;

    if let Some(folder) = state.task_folder.path() {
        eprintln!("Artifacts: {}", config.workspace.root.join(folder).display());
    }
    println!("{}", state.final_report);

    Ok(())
}
