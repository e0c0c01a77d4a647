//! recap - chat with a local model that periodically compresses its own history

mod commands;
mod config;

use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use recap_agent::{ConversationState, TurnConfig, TurnEvent, TurnExecutor};
use recap_ai::providers::get_api_key;
use recap_ai::providers::ollama::{API_KEY_ENV, OllamaConfig, OllamaProvider};
use recap_ai::{InferenceGateway, ProviderGateway, RetryConfig, RetryingGateway, StreamOptions};

/// recap - chat with periodic history compression
#[derive(Parser, Debug)]
#[command(name = "recap")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model used to summarize (default: qwen3-4b:latest)
    #[arg(long)]
    cheap_model: Option<String>,

    /// Model used to answer (default: qwen2.5-coder-7b:latest)
    #[arg(long)]
    capable_model: Option<String>,

    /// Backend base URL (default: $OLLAMA_HOST or http://localhost:11434)
    #[arg(long)]
    base_url: Option<String>,

    /// Compress every N answered turns
    #[arg(long)]
    threshold: Option<u32>,

    /// Conversation id (default: random UUID)
    #[arg(long)]
    chat_id: Option<String>,

    /// Deadline for a single model call, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Retries for transient backend failures
    #[arg(long)]
    max_retries: Option<u32>,

    /// Cap on generated tokens per model call
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// Run in non-interactive mode with a single prompt
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

/// Everything the binary needs after merging flags, config file and defaults
#[derive(Debug, Clone)]
struct Settings {
    turn: TurnConfig,
    provider: OllamaConfig,
    stream: StreamOptions,
    max_retries: u32,
    chat_id: String,
}

impl Settings {
    /// CLI flag > config file > built-in default
    fn resolve(args: &Args, cfg: &config::Config) -> Self {
        let defaults = TurnConfig::default();
        let turn = TurnConfig {
            threshold: args.threshold.or(cfg.threshold).unwrap_or(defaults.threshold),
            cheap_model_id: args
                .cheap_model
                .clone()
                .or_else(|| cfg.cheap_model.clone())
                .unwrap_or(defaults.cheap_model_id),
            capable_model_id: args
                .capable_model
                .clone()
                .or_else(|| cfg.capable_model.clone())
                .unwrap_or(defaults.capable_model_id),
        };

        let env = OllamaConfig::from_env();
        let mut provider = OllamaConfig {
            base_url: args
                .base_url
                .clone()
                .or_else(|| cfg.base_url.clone())
                .unwrap_or(env.base_url),
            api_key: get_api_key(cfg.api_key.as_deref(), API_KEY_ENV),
            ..OllamaConfig::default()
        };
        if let Some(secs) = args.timeout_secs.or(cfg.timeout_secs) {
            provider.request_timeout = Duration::from_secs(secs);
        }

        let stream = StreamOptions {
            max_tokens: args.max_tokens.or(cfg.max_tokens),
            temperature: args.temperature.or(cfg.temperature),
        };

        Self {
            turn,
            provider,
            stream,
            max_retries: args
                .max_retries
                .or(cfg.max_retries)
                .unwrap_or(RetryConfig::default().max_retries),
            chat_id: args
                .chat_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        }
    }

    fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            ..RetryConfig::default()
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("recap=debug,recap_agent=debug,recap_ai=debug")
    } else {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => return,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_executor(settings: &Settings) -> anyhow::Result<TurnExecutor> {
    let provider = OllamaProvider::new(settings.provider.clone())?;
    let gateway: Arc<dyn InferenceGateway> = Arc::new(RetryingGateway::new(
        ProviderGateway::new(provider).with_options(settings.stream.clone()),
        settings.retry_config(),
    ));
    Ok(TurnExecutor::new(settings.turn.clone(), gateway)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();
    let settings = Settings::resolve(&args, &cfg);
    let executor = build_executor(&settings)?;

    let notices = spawn_notice_printer(&executor);

    let result = if let Some(ref command) = args.command {
        run_command(&executor, &settings.chat_id, command).await
    } else {
        run_interactive(&executor, &settings).await
    };

    notices.abort();
    result
}

/// Print compression notices as they happen
fn spawn_notice_printer(executor: &TurnExecutor) -> tokio::task::JoinHandle<()> {
    let mut receiver = executor.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(TurnEvent::SummaryStart { messages, .. }) => {
                    eprintln!("[Compressing {} messages...]", messages);
                }
                Ok(TurnEvent::SummaryEnd { summary_chars, .. }) => {
                    eprintln!("[Summary updated: {} chars]", summary_chars);
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Run one turn, cancelling it if Ctrl-C arrives first
async fn run_cancellable(
    executor: &TurnExecutor,
    chat_id: &str,
    prior: Option<&ConversationState>,
    input: &str,
) -> recap_agent::Result<ConversationState> {
    let cancel = CancellationToken::new();
    let turn = executor.run_turn_with_cancel(chat_id, prior, input, cancel.clone());
    tokio::pin!(turn);

    tokio::select! {
        result = &mut turn => result,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            turn.await
        }
    }
}

async fn run_command(executor: &TurnExecutor, chat_id: &str, command: &str) -> anyhow::Result<()> {
    println!("recap> {}", command);
    println!();

    let state = run_cancellable(executor, chat_id, None, command).await?;
    if let Some(reply) = state.last_message() {
        println!("{}", reply.content);
    }
    Ok(())
}

async fn run_interactive(executor: &TurnExecutor, settings: &Settings) -> anyhow::Result<()> {
    let chat_id = settings.chat_id.as_str();
    let mut state: Option<ConversationState> = None;

    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!(
            "recap ({} / {}) chat: {}",
            settings.turn.cheap_model_id, settings.turn.capable_model_id, chat_id
        );
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        // Ctrl-C at an idle prompt leaves, like EOF
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            // EOF
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) =
            commands::execute_command(input, chat_id, state.as_ref(), executor.router())
        {
            match result {
                commands::CommandResult::Exit => break,
                commands::CommandResult::Message(msg) => println!("{}", msg),
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            continue;
        }

        match run_cancellable(executor, chat_id, state.as_ref(), input).await {
            Ok(next) => {
                if let Some(reply) = next.last_message() {
                    println!("{}", reply.content);
                }
                println!();
                state = Some(next);
            }
            Err(recap_agent::Error::Cancelled) => {
                eprintln!("[Cancelled. Conversation unchanged.]");
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                if e.is_retryable() {
                    eprintln!("The conversation is unchanged; send the message again to retry.");
                }
            }
        }
    }

    Ok(())
}
