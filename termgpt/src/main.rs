use std::io::Write;

use clap::Parser;
use termgpt::cli::{self, Args};
use termgpt::{ChatError, ChatSession, TurnStats};
use termgpt_config::{Config, settings_help};
use termgpt_history::HistoryStore;
use termgpt_types::HistoryError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run_cli(args).await {
        eprintln!("termgpt error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli(args: Args) -> Result<(), ChatError> {
    let config_path = args.config_path();
    if args.list_settings {
        println!("{}", settings_help());
        return Ok(());
    }
    let mut config = Config::load_or_default(&config_path)?;

    let changed = args.apply_config_changes(&mut config)?;
    if changed {
        config.save(&config_path)?;
        eprintln!("saved config to {}", config_path.display());
    }
    if args.show_config {
        println!("{}", config.describe());
        return Ok(());
    }
    if args.list_modes {
        for name in config.run_mode_names() {
            println!("{name}");
        }
        return Ok(());
    }

    let history = HistoryStore::new(args.history_path());
    if args.clear {
        match history.clear().await {
            Ok(()) => eprintln!("history cleared"),
            Err(HistoryError::NotFound(path)) => {
                eprintln!("no history to clear at {}", path.display())
            }
            Err(e) => return Err(e.into()),
        }
    }

    let prompt = args.prompt();
    if prompt.is_none() && !args.again && (args.clear || changed) {
        return Ok(());
    }

    let mut session = ChatSession::new(config, history)?.persist_config_to(&config_path);
    if let Some(mode) = &args.mode {
        session = session.with_run_mode(mode)?;
    }

    if args.again {
        let stats = run_turn(&mut session, None).await?;
        report(&session, &stats);
        return Ok(());
    }
    if let Some(prompt) = prompt {
        let stats = run_turn(&mut session, Some(&prompt)).await?;
        report(&session, &stats);
        return Ok(());
    }
    interactive(&mut session).await
}

async fn interactive(session: &mut ChatSession) -> Result<(), ChatError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("\nEnter your message, or 'e' to exit:");
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        if cli::is_exit(&line) {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }
        match run_turn(session, Some(&line)).await {
            Ok(stats) => report(session, &stats),
            Err(err) if err.is_recoverable() => eprintln!("error: {err}"),
            Err(err) => return Err(err),
        }
    }
}

/// Send one prompt (or the last one again), streaming the reply to stdout.
///
/// A failed stdout write is reported after the turn, which by then is already
/// in history: the reply was received even though it could not be shown.
async fn run_turn(session: &mut ChatSession, prompt: Option<&str>) -> Result<TurnStats, ChatError> {
    let mut stdout = std::io::stdout();
    let mut write_error = None;
    let mut on_delta = |delta: &str| {
        if write_error.is_some() {
            return;
        }
        if let Err(e) = stdout.write_all(delta.as_bytes()).and_then(|()| stdout.flush()) {
            write_error = Some(e);
        }
    };
    let stats = match prompt {
        Some(prompt) => session.send(prompt, &mut on_delta).await?,
        None => session.send_again(&mut on_delta).await?,
    };
    if let Some(e) = write_error {
        return Err(e.into());
    }
    println!();
    Ok(stats)
}

fn report(session: &ChatSession, stats: &TurnStats) {
    if session.config().print_stats {
        eprintln!("{stats}");
        if stats.history_dropped > 0 {
            eprintln!(
                "[{} older history entries left out to fit max_total_tokens]",
                stats.history_dropped
            );
        }
    }
}
