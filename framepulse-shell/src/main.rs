use anyhow::Result;
use colored::Colorize;
use framepulse::prelude::*;
use framepulse::{ENGINE_NAME, VERSION as LIB_VERSION};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commands forwarded from the REPL to the task that owns the engine.
enum Command {
    Schedule { phase: Phase, looping: bool },
    Cancel { handle: usize },
    Pause,
    Play,
    Clear,
    State,
    List,
}

/// A scheduled callback as the shell tracks it, keyed by its handle number.
struct HandleEntry {
    id: CallbackId,
    phase: Phase,
    looping: bool,
}

fn describe(handle: usize, entry: &HandleEntry) -> String {
    format!(
        "  #{}: {} {}",
        handle,
        if entry.looping { "looping" } else { "one-shot" },
        entry.phase
    )
}

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct CommandHighlighter;

impl Highlighter for CommandHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.cyan().bold(), rest.cyan()))
        } else {
            Cow::Owned(line.cyan().bold().to_string())
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    println!("{}", ENGINE_NAME.cyan().bold());
    println!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", "Type 'help' for commands or 'exit' to quit.".dimmed());
}

/// Owns the engine: applies shell commands and delivers host ticks at the
/// configured refresh cadence whenever the engine has a request pending.
async fn drive_engine(config: FrameConfig, mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut engine = FrameEngine::with_host(
        &config,
        Some(Box::new(PollSource::new())),
        Box::new(MonotonicClock::new()),
    );
    let mut handles: HashMap<usize, HandleEntry> = HashMap::new();
    let mut next_handle: usize = 0;

    let mut interval = tokio::time::interval(config.refresh.period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(command) => apply(&mut engine, command, &mut handles, &mut next_handle),
                    None => break,
                }
            }
            _ = interval.tick() => {
                if engine.tick_requested() {
                    let now = engine.host_now();
                    engine.deliver_tick(now);
                }
            }
        }
    }
}

fn apply(
    engine: &mut FrameEngine,
    command: Command,
    handles: &mut HashMap<usize, HandleEntry>,
    next_handle: &mut usize,
) {
    match command {
        Command::Schedule { phase, looping } => {
            let options = if looping {
                ScheduleOptions::LOOP
            } else {
                ScheduleOptions::ONCE
            };
            let invocations = Arc::new(AtomicU64::new(0));
            let id = engine.schedule(phase, options, move |state, _| {
                let n = invocations.fetch_add(1, Ordering::Relaxed) + 1;
                // Loops report every 60th frame to keep the prompt readable.
                if !looping || n % 60 == 0 {
                    println!(
                        "\n<-- [{}] invocation #{} at t={:.1} ms (delta {:.2} ms)",
                        phase, n, state.timestamp, state.delta
                    );
                }
            });
            let handle = *next_handle;
            *next_handle += 1;
            handles.insert(handle, HandleEntry { id, phase, looping });
            println!(
                "--> Scheduled {} {} callback with handle #{}",
                if looping { "looping" } else { "one-shot" },
                phase,
                handle
            );
        }
        Command::Cancel { handle } => match handles.remove(&handle) {
            Some(entry) => {
                engine.cancel(entry.id);
                println!("--> Cancelled handle #{}", handle);
            }
            None => println!("Error: no handle #{}. Use 'list'.", handle),
        },
        Command::Pause => {
            engine.pause();
            println!("--> Engine paused.");
        }
        Command::Play => {
            engine.play();
            if engine.is_paused() {
                println!("--> Still paused: play resumes only with recurring work pending.");
            } else {
                println!("--> Engine resumed.");
            }
        }
        Command::Clear => {
            engine.clear();
            handles.clear();
            println!("--> Engine cleared.");
        }
        Command::State => {
            let state = engine.state();
            println!(
                "--> t={:.1} ms, delta={:.2} ms, paused={}, active loops={}, tick requested={}",
                state.timestamp,
                state.delta,
                engine.is_paused(),
                engine.active_loop_count(),
                engine.tick_requested()
            );
        }
        Command::List => {
            if handles.is_empty() {
                println!("No active handles.");
                return;
            }
            println!("Active handles:");
            let mut listing: Vec<_> = handles.iter().collect();
            listing.sort_by_key(|(handle, _)| **handle);
            for (handle, entry) in listing {
                println!("{}", describe(*handle, entry));
            }
        }
    }
}

fn parse(args: &[&str]) -> Option<Result<Command, String>> {
    let command = match *args.first()? {
        "schedule" => {
            let Some(phase) = args.get(1) else {
                return Some(Err("Usage: schedule <read|update|render> [loop]".into()));
            };
            match phase.parse::<Phase>() {
                Ok(phase) => Ok(Command::Schedule {
                    phase,
                    looping: args.get(2) == Some(&"loop"),
                }),
                Err(err) => Err(err.to_string()),
            }
        }
        "cancel" => match args.get(1).and_then(|raw| raw.parse::<usize>().ok()) {
            Some(handle) => Ok(Command::Cancel { handle }),
            None => Err("Usage: cancel <HANDLE>".into()),
        },
        "pause" => Ok(Command::Pause),
        "play" => Ok(Command::Play),
        "clear" => Ok(Command::Clear),
        "state" => Ok(Command::State),
        "list" => Ok(Command::List),
        other => Err(format!("Unknown command: '{}'. Type 'help'.", other)),
    };
    Some(command)
}

fn print_help() {
    println!("Available commands:");
    println!("  schedule <PHASE> [loop]  - Registers a callback (phases: read, update, render).");
    println!("  cancel <HANDLE>          - Cancels a callback by its handle.");
    println!("  list                     - Shows active handles.");
    println!("  pause / play             - Pauses or resumes the engine.");
    println!("  state                    - Prints the current timing state.");
    println!("  clear                    - Resets the engine completely.");
    println!("  exit                     - Quits the shell.");
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .init();

    let config = FrameConfig::load(None)?;
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    tokio::spawn(drive_engine(config, command_rx));

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CommandHighlighter));

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let args = line.trim().split_whitespace().collect::<Vec<_>>();
                match args.first().copied() {
                    None => {}
                    Some("exit") => break,
                    Some("help") => print_help(),
                    Some(_) => match parse(&args) {
                        Some(Ok(command)) => {
                            if command_tx.send(command).is_err() {
                                println!("Engine task has stopped; exiting.");
                                break;
                            }
                        }
                        Some(Err(message)) => println!("{}", message),
                        None => {}
                    },
                }
            }
            Err(_) => {
                println!("Exiting shell...");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_listing_shows_phase_and_mode() {
        let entry = HandleEntry {
            id: CallbackId::default(),
            phase: Phase::Render,
            looping: true,
        };
        assert_eq!(describe(3, &entry), "  #3: looping render");

        let entry = HandleEntry {
            id: CallbackId::default(),
            phase: Phase::Read,
            looping: false,
        };
        assert_eq!(describe(0, &entry), "  #0: one-shot read");
    }
}
