//! Riddle Lock · participant CLI
//!
//! Lists the current riddles, submits answers, and shows the combination
//! assembled so far. Progress lives in a local state directory and only ever
//! holds digits the server confirmed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use riddle_lock::client::{BoardEntry, ProgressStore, Reconciler, RiddleApiClient, SubmitOutcome};
use riddle_lock::domain::Position;
use riddle_lock::telemetry;

#[derive(Parser, Debug)]
#[command(name = "riddle-player", version, about = "Solve riddles, collect the lock combination")]
struct Cli {
    /// Base URL of the riddle API
    #[arg(long, env = "RIDDLE_API_URL", default_value = "http://127.0.0.1:3000")]
    api_url: String,

    /// Directory holding local progress
    #[arg(long, env = "RIDDLE_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show active and expired riddles
    List,
    /// Submit an answer for a riddle
    Answer {
        riddle_id: String,
        /// Answer text; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        answer: Vec<String>,
    },
    /// Show the combination collected so far
    Combo,
    /// Forget all local progress
    Reset,
}

fn default_state_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("riddle-lock")
}

fn print_entry(entry: &BoardEntry) {
    let mark = if entry.solved { "x" } else { " " };
    let week = entry.riddle.week.map(|w| format!(" week {w}")).unwrap_or_default();
    println!("  [{mark}] #{}{week}  {}", entry.riddle.position, entry.riddle.riddle_text);
    println!("        id: {}", entry.riddle.id);
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_tracing_with(telemetry::CLIENT_DEFAULT_FILTER);
    let cli = Cli::parse();

    let api = match RiddleApiClient::new(&cli.api_url) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let store = ProgressStore::new(cli.state_dir.unwrap_or_else(default_state_dir));
    let reconciler = Reconciler::open(api, store).await;

    match cli.command {
        Command::List => match reconciler.load_active_riddles().await {
            Ok(board) if board.is_empty() => println!("No riddles are active yet. Check back later."),
            Ok(board) => {
                if !board.active.is_empty() {
                    println!("Active riddles:");
                    for pos in Position::ALL {
                        if let Some(entry) = board.current_for(pos) {
                            print_entry(entry);
                        }
                    }
                    for entry in &board.active {
                        let shown = Position::new(entry.riddle.position as i64)
                            .and_then(|p| board.current_for(p))
                            .is_some_and(|c| c.riddle.id == entry.riddle.id);
                        if !shown {
                            print_entry(entry);
                        }
                    }
                }
                if !board.expired.is_empty() {
                    println!("Expired riddles:");
                    board.expired.iter().for_each(print_entry);
                }
            }
            Err(e) => {
                eprintln!("error: could not load riddles ({e}). Please try again.");
                return ExitCode::FAILURE;
            }
        },
        Command::Answer { riddle_id, answer } => {
            match reconciler.submit_answer(&riddle_id, &answer.join(" ")).await {
                SubmitOutcome::Correct { position, digit, is_expired, unlocked } => {
                    println!("Correct! Digit {digit} goes in position {position}.");
                    if is_expired {
                        println!("(This riddle has expired. Its digit only fills a gap and does not open the lock.)");
                    }
                    println!("Combination: {}", reconciler.compute_combination().await);
                    if unlocked {
                        println!("All three digits found. Go open the lock!");
                    }
                }
                SubmitOutcome::Incorrect { message } => println!("{message}"),
                SubmitOutcome::Error(e) if e.is_not_found() => {
                    eprintln!("error: that riddle is not available.");
                    return ExitCode::FAILURE;
                }
                SubmitOutcome::Error(e) => {
                    eprintln!("error: could not check the answer ({e}). Nothing was saved; try again.");
                    return ExitCode::FAILURE;
                }
            }
        }
        Command::Combo => {
            let combo = reconciler.compute_combination().await;
            println!("Combination: {combo}");
            let stale: Vec<String> = Position::ALL
                .iter()
                .filter(|p| combo.is_stale(**p))
                .map(|p| p.to_string())
                .collect();
            if !stale.is_empty() {
                println!("From expired riddles (not current): position {}", stale.join(", "));
            }
            if combo.is_unlocked() {
                println!("All three digits found. Go open the lock!");
            }
        }
        Command::Reset => {
            if let Err(e) = reconciler.reset_progress().await {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
            println!("Progress cleared.");
        }
    }
    ExitCode::SUCCESS
}
