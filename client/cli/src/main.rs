//! Chatbot - Terminal Front End
//!
//! Interactive chat against the inference service, with streamed answers
//! and `<think>` segments shown apart from the final response.
//!
//! # Usage
//!
//! ```bash
//! # Interactive session with the backend's default model
//! chatbot
//!
//! # One question, then exit
//! chatbot ask "why is the sky blue?"
//!
//! # Different backend and model
//! chatbot --api-url http://gpu-box:8000/api/v1 --model deepseek-r1:8b
//!
//! # List models / check the backend
//! chatbot models
//! chatbot health
//!
//! # Verbose logging (written to stderr)
//! RUST_LOG=chatbot_core=debug chatbot
//! ```

mod render;
mod repl;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use chatbot_core::config::{self, ConfigOverrides};
use chatbot_core::{
    is_thinking_model, ChatController, ChatEvent, HttpBackend, RejectReason, SubmitOutcome,
};

use render::Renderer;
use repl::Input;

/// Streaming chat client for the inference service
#[derive(Parser, Debug)]
#[command(name = "chatbot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL
    #[arg(short = 'u', long, env = "CHATBOT_API_URL", value_name = "URL")]
    api_url: Option<String>,

    /// Model to use instead of the backend default
    #[arg(short = 'm', long, env = "CHATBOT_MODEL")]
    model: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "CHATBOT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// HTTP connect timeout in milliseconds (0 disables)
    #[arg(long, value_name = "MS")]
    connect_timeout_ms: Option<u64>,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "CHATBOT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session (default)
    Chat,
    /// Send one message and print the answer
    Ask {
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// List available models
    Models,
    /// Check whether the backend is reachable
    Health,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("chatbot={level},chatbot_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

type Controller = ChatController<HttpBackend>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config_path = args.config.clone().or_else(config::default_config_path);
    let mut config =
        config::load_config_from_path(config_path).context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(url) = args.api_url.clone() {
        overrides = overrides.with_api_base_url(url);
    }
    if let Some(model) = args.model.clone() {
        overrides = overrides.with_default_model(model);
    }
    if let Some(ms) = args.connect_timeout_ms {
        overrides = overrides.with_connect_timeout_ms(ms);
    }
    overrides.apply(&mut config);
    config.validate()?;

    info!(
        api = %config.api_base_url,
        source = %config.source(),
        "Configuration loaded"
    );

    let backend = HttpBackend::from_config(&config).context("Failed to create HTTP client")?;
    let (controller, mut events) = ChatController::new(backend, config.event_channel_capacity);
    if let Some(model) = config.default_model.clone() {
        controller.select_model(model);
    }
    let mut renderer = Renderer::new(io::stdout(), !args.no_color);

    match args.command.unwrap_or(Command::Chat) {
        Command::Health => {
            if controller.health_check().await {
                println!("ok: {}", config.api_base_url);
                Ok(())
            } else {
                anyhow::bail!("backend unreachable at {}", config.api_base_url)
            }
        }
        Command::Models => {
            controller.load_models().await?;
            print_models(&controller);
            Ok(())
        }
        Command::Ask { message } => {
            ensure_model(&controller).await?;
            let outcome = run_turn(&controller, &mut events, &mut renderer, &message.join(" ")).await?;
            match outcome {
                Some(SubmitOutcome::Failed { error, .. }) => anyhow::bail!(error),
                Some(SubmitOutcome::Rejected(reason)) => anyhow::bail!("message not sent: {reason}"),
                _ => Ok(()),
            }
        }
        Command::Chat => {
            ensure_model(&controller).await?;
            interactive(&controller, &mut events, &mut renderer).await
        }
    }
}

/// Load the model list, failing only if no model ends up selected
async fn ensure_model(controller: &Controller) -> Result<()> {
    if let Err(e) = controller.load_models().await {
        warn!(error = %e, "Could not load models");
        if controller.selected_model().is_none() {
            return Err(e).context("No model selected and the model list is unavailable");
        }
    }
    Ok(())
}

fn print_models(controller: &Controller) {
    let selected = controller.selected_model();
    for model in controller.models() {
        let marker = if selected.as_deref() == Some(model.as_str()) { '*' } else { ' ' };
        let hint = if is_thinking_model(&model) { "  (thinking)" } else { "" };
        println!("{marker} {model}{hint}");
    }
}

/// Run one turn while rendering its events
///
/// Returns `None` when Ctrl-C abandoned the turn.
async fn run_turn(
    controller: &Controller,
    events: &mut mpsc::Receiver<ChatEvent>,
    renderer: &mut Renderer<io::Stdout>,
    text: &str,
) -> Result<Option<SubmitOutcome>> {
    let turn = controller.submit(text);
    tokio::pin!(turn);

    let outcome = loop {
        tokio::select! {
            outcome = &mut turn => break Some(outcome),
            Some(event) = events.recv() => renderer.handle(&event)?,
            _ = signal::ctrl_c() => {
                info!("Turn abandoned");
                break None;
            }
        }
    };

    if outcome.is_none() {
        controller.clear().await;
    }
    flush_events(events, renderer)?;
    Ok(outcome)
}

/// Render events that are already queued
fn flush_events(events: &mut mpsc::Receiver<ChatEvent>, renderer: &mut Renderer<io::Stdout>) -> Result<()> {
    while let Ok(event) = events.try_recv() {
        renderer.handle(&event)?;
    }
    Ok(())
}

async fn interactive(
    controller: &Controller,
    events: &mut mpsc::Receiver<ChatEvent>,
    renderer: &mut Renderer<io::Stdout>,
) -> Result<()> {
    if let Some(model) = controller.selected_model() {
        println!("chatbot using {model}. Type /help for commands.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            return Ok(());
        };

        match repl::parse(&line) {
            Input::Message(text) => {
                if let Some(SubmitOutcome::Rejected(reason)) =
                    run_turn(controller, events, renderer, &text).await?
                {
                    if reason != RejectReason::EmptyMessage {
                        println!("not sent: {reason}");
                    }
                }
            }
            Input::Clear => {
                controller.clear().await;
                flush_events(events, renderer)?;
            }
            Input::Models => match controller.load_models().await {
                Ok(_) => print_models(controller),
                Err(e) => println!("error: {e}"),
            },
            Input::Model(model) => {
                controller.select_model(model.as_str());
                println!("using {model}");
            }
            Input::Health => {
                let status = if controller.health_check().await { "ok" } else { "unreachable" };
                println!("backend {status}");
            }
            Input::Help => println!("{}", repl::HELP),
            Input::Quit => return Ok(()),
            Input::Unknown(message) => println!("{message}"),
        }
    }
}
