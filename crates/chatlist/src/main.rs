//! Compares the answers of every configured provider in the terminal.

#[macro_use]
extern crate tracing;

use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use chatlist::core::{
    DEFAULT_TIMEOUT_SECS, DispatchEvent, DispatchOptions,
    DispatchOptionsBuilder,
};
use chatlist::improver::{self, Variant};
use chatlist::model::{ProviderConfig, RequestOutcome};
use chatlist::{ComparisonBuilder, catalog};
use chatlist_providers::HttpExecutorBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";
const DEFAULT_CATALOG: &str = "providers.json";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const USAGE: &str = "usage: chatlist <prompt>
       chatlist --improve <variant> <prompt>

The prompt is read from stdin when not given.
Variants: improved, reformulated, code, analysis, creative.

Environment:
  CHATLIST_PROVIDERS        provider catalog (default: providers.json)
  CHATLIST_TIMEOUT          request timeout in seconds (default: 30)
  CHATLIST_MAX_TOKENS       cap on the length of answers
  CHATLIST_MAX_CONCURRENCY  requests in flight at once (default: unbounded)";

enum Command {
    Compare(String),
    Improve(Variant, String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Some(command) = parse_args().await else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let catalog_path = env::var("CHATLIST_PROVIDERS")
        .unwrap_or_else(|_| DEFAULT_CATALOG.to_owned());
    let catalog = match catalog::load(&catalog_path) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("{}", err.red());
            return ExitCode::FAILURE;
        }
    };
    let options = options_from_env();
    debug!("dispatch options: {options:?}");

    let executor = match HttpExecutorBuilder::new()
        .with_connect_timeout(CONNECT_TIMEOUT)
        .build()
    {
        Ok(executor) => executor,
        Err(err) => {
            eprintln!("{}", format!("failed to set up HTTP client: {err}").red());
            return ExitCode::FAILURE;
        }
    };
    let builder = ComparisonBuilder::with_executor(executor).with_options(options);

    match command {
        Command::Compare(prompt) => {
            compare(builder, &prompt, &catalog.enabled()).await
        }
        Command::Improve(variant, prompt) => {
            let Some(provider) = catalog.enabled().into_iter().next() else {
                eprintln!("{}", "no providers selected".red());
                return ExitCode::FAILURE;
            };
            let comparison = builder.build();
            let improvement =
                improver::improve(&comparison, &provider, &prompt, variant)
                    .await;
            if let Some(error) = &improvement.error {
                eprintln!("{}", error.red());
                return ExitCode::FAILURE;
            }
            println!("{}", improvement.value);
            ExitCode::SUCCESS
        }
    }
}

async fn compare(
    builder: ComparisonBuilder,
    prompt: &str,
    providers: &[ProviderConfig],
) -> ExitCode {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let comparison = builder
        .on_event(move |event| {
            event_tx.send(event).ok();
        })
        .build();

    let handle = match comparison.submit(prompt, providers) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("{}", err.red());
            return ExitCode::FAILURE;
        }
    };

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let total = handle.provider_count();
    let mut received = 0;
    let mut progress_bar = None;

    let batch = loop {
        // Create a new progress bar if it has been finished.
        progress_bar
            .get_or_insert_with(|| {
                let progress_bar = ProgressBar::new_spinner();
                progress_bar.set_style(progress_style.clone());
                progress_bar
            })
            .set_message(format!("🤔 Waiting for answers ({received}/{total})"));
        if let Some(progress_bar) = &progress_bar {
            progress_bar.inc(1);
        }

        let sleep = sleep(Duration::from_millis(100));
        let event = select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    break None;
                };
                event
            },
            _ = sleep => {
                continue;
            }
        };

        // Finish the progress bar before printing anything else.
        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }

        match event {
            DispatchEvent::OutcomeRecorded { outcome, .. } => {
                received += 1;
                print_outcome(&outcome);
            }
            DispatchEvent::BatchCompleted(batch)
            | DispatchEvent::BatchCancelled(batch) => {
                break Some(batch);
            }
        }
    };
    if let Some(progress_bar) = progress_bar {
        progress_bar.finish_and_clear();
    }

    let Some(batch) = batch else {
        eprintln!("{}", "dispatcher has shut down".red());
        return ExitCode::FAILURE;
    };
    let summary = batch.summary();
    let status = summary.status();
    if summary.succeeded == 0 {
        println!("{}", status.bright_red().bold());
        ExitCode::FAILURE
    } else {
        println!("{}", status.bright_green().bold());
        ExitCode::SUCCESS
    }
}

fn print_outcome(outcome: &RequestOutcome) {
    let seconds = outcome.duration().as_secs_f64();
    if outcome.is_success() {
        let bar = BAR_CHAR.bright_cyan();
        let tokens = outcome
            .tokens_used()
            .map(|t| format!(", {t} tokens"))
            .unwrap_or_default();
        println!(
            "{bar}🤖 {} {}",
            outcome.provider_name().bright_white().bold(),
            format!(
                "({}, {seconds:.2}s{tokens})",
                outcome.model_used().unwrap_or("unknown model")
            )
            .dimmed()
        );
        for line in outcome.text().lines() {
            println!("{bar}{line}");
        }
    } else {
        let bar = BAR_CHAR.bright_red();
        println!(
            "{bar}⚠️  {} {}",
            outcome.provider_name().bright_white().bold(),
            format!("({seconds:.2}s)").dimmed()
        );
        println!("{bar}{}", outcome.display_text().red());
    }
    println!();
}

async fn parse_args() -> Option<Command> {
    let mut args = env::args().skip(1).peekable();
    let improve = args.next_if(|arg| arg == "--improve").is_some();
    let variant = if improve {
        Some(Variant::parse(&args.next()?)?)
    } else {
        None
    };
    if args.peek().is_some_and(|arg| arg == "-h" || arg == "--help") {
        return None;
    }

    let mut prompt = args.collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        prompt = read_stdin().await?;
    }
    match variant {
        Some(variant) => Some(Command::Improve(variant, prompt)),
        None => Some(Command::Compare(prompt)),
    }
}

async fn read_stdin() -> Option<String> {
    let mut input = String::new();
    match io::stdin().read_to_string(&mut input).await {
        Ok(_) => Some(input),
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

fn options_from_env() -> DispatchOptions {
    let mut builder = DispatchOptionsBuilder::new().with_timeout_secs(
        env_number("CHATLIST_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_SECS),
    );
    if let Some(max_tokens) = env_number("CHATLIST_MAX_TOKENS") {
        builder = builder.with_max_tokens(max_tokens);
    }
    if let Some(max) = env_number("CHATLIST_MAX_CONCURRENCY") {
        builder = builder.with_max_concurrency(max);
    }
    builder.build()
}

fn env_number<T: FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.trim().parse() {
        Ok(number) => Some(number),
        Err(_) => {
            warn!("ignoring {name}: `{value}` is not a number");
            None
        }
    }
}
