//! chatstream CLI - blocking vs streamed chat completions
//!
//! Sends one prompt to an OpenAI-compatible endpoint and reports when the
//! answer arrived.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use std::process::ExitCode;
use std::time::Duration;

use chatstream::prelude::*;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Compare blocking and streamed chat completion latency
#[derive(Parser)]
#[command(name = "chatstream")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for the whole answer in one response
    Complete(PromptArgs),

    /// Stream the answer and print every fragment with its arrival time
    Stream(PromptArgs),

    /// Run both modes and print a latency report
    Compare(PromptArgs),
}

/// Arguments shared by every command
#[derive(Args)]
struct PromptArgs {
    /// User message to send
    prompt: String,

    /// Model to use
    #[arg(short, long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Sampling temperature
    #[arg(short, long, default_value_t = 0.0)]
    temperature: f32,

    /// Optional system message sent before the prompt
    #[arg(short, long)]
    system: Option<String>,
}

impl PromptArgs {
    fn request(&self, client: &ChatClient) -> ChatRequest {
        let mut request = ChatRequest::new(client.model());
        if let Some(system) = &self.system {
            request = request.system(system.as_str());
        }
        request.user(self.prompt.as_str()).temperature(self.temperature)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "chatstream_cli={level},chatstream={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Complete(args) => cmd_complete(args).await,
        Commands::Stream(args) => cmd_stream(args).await,
        Commands::Compare(args) => cmd_compare(args).await,
    }
}

/// Build a consumer over the HTTP client, configured from the environment.
fn connect(args: &PromptArgs) -> Result<StreamConsumer<ChatClient>> {
    let mut config = ClientConfig::from_env()?;
    if let Some(model) = &args.model {
        config = config.with_model(model.as_str());
    }
    let client = ChatClient::new(config)?;
    tracing::debug!(base_url = client.base_url(), model = client.model(), "client ready");
    Ok(StreamConsumer::new(client))
}

async fn cmd_complete(args: PromptArgs) -> Result<()> {
    let consumer = connect(&args)?;
    let request = args.request(consumer.transport());

    let timed = consumer.complete(&request).await?;
    println!("{}", timed.value.text().unwrap_or_default());
    println!();
    println!("received in {}", millis(timed.elapsed));
    if let Some(usage) = timed.value.usage {
        println!(
            "tokens: {} prompt + {} completion = {}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }
    Ok(())
}

async fn cmd_stream(args: PromptArgs) -> Result<()> {
    let consumer = connect(&args)?;
    let request = args.request(consumer.transport()).stream();

    let consumption = match consumer.consume(&request).await {
        Ok(consumption) => consumption,
        Err(interrupted) => {
            print_log(&interrupted.partial);
            return Err(interrupted.into());
        }
    };

    print_log(&consumption);
    println!();
    println!("{}", consumption.full_text);
    println!();
    match consumption.time_to_first_content() {
        Some(first) => println!("first content after {}", millis(first)),
        None => println!("no content received"),
    }
    println!(
        "stream closed after {} ({} fragments)",
        millis(consumption.elapsed),
        consumption.fragment_count()
    );
    Ok(())
}

async fn cmd_compare(args: PromptArgs) -> Result<()> {
    let consumer = connect(&args)?;
    let request = args.request(consumer.transport());

    let report = consumer.compare(&request).await?;
    println!("{}", report.streamed_text);
    println!();
    println!("{report}");
    Ok(())
}

fn print_log(consumption: &Consumption) {
    for entry in &consumption.log {
        let fragment = &entry.fragment;
        let role = fragment.role.as_ref().map_or("", Role::as_str);
        let content = fragment.content.as_deref().unwrap_or_default();
        let finish = fragment.finish_reason.as_deref().unwrap_or_default();
        println!(
            "{:>10}  {role:<9} {content:?} {finish}",
            millis(entry.elapsed)
        );
    }
}

fn millis(duration: Duration) -> String {
    format!("{:.1}ms", duration.as_secs_f64() * 1000.0)
}
