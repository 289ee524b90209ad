mod console;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{QuizDefinition, QuizId};
use quiz_core::{AttemptEvent, Phase};
use services::{
    AttemptLoopService, AttemptServiceError, AttemptSession, ChannelSink, Clock, TICK_PERIOD,
    TickerHandle,
};
use storage::repository::{InMemoryRepository, Storage};
use storage::sample::CORPORATE_ETHICS_ID;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use console::{Command, CommandError, HELP};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { origin: &'static str, raw: String },
    InvalidTickMs { origin: &'static str, raw: String },
    InvalidQuizFile { origin: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { origin, raw }
            | ArgsError::InvalidTickMs { origin, raw }
            | ArgsError::InvalidQuizFile { origin, raw } => {
                write!(f, "invalid {origin} value: {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug)]
struct Args {
    quiz_file: Option<PathBuf>,
    quiz_id: Option<QuizId>,
    list: bool,
    tick_period: Duration,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz [--quiz <path.json>] [--quiz-id <id>] [--tick-ms <ms>]");
    eprintln!("  quiz --list [--quiz <path.json>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  built-in catalogue, quiz id {CORPORATE_ETHICS_ID}");
    eprintln!("  --tick-ms 1000");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_FILE, QUIZ_ID, QUIZ_TICK_MS, RUST_LOG");
}

fn parse_quiz_file(raw: String, origin: &'static str) -> Result<PathBuf, ArgsError> {
    if raw.trim().is_empty() {
        return Err(ArgsError::InvalidQuizFile { origin, raw });
    }
    Ok(PathBuf::from(raw))
}

fn parse_quiz_id(raw: String, origin: &'static str) -> Result<QuizId, ArgsError> {
    raw.parse::<QuizId>()
        .map_err(|_| ArgsError::InvalidQuizId { origin, raw })
}

fn parse_tick_ms(raw: String, origin: &'static str) -> Result<Duration, ArgsError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ArgsError::InvalidTickMs { origin, raw }),
    }
}

impl Args {
    /// Parse flags on top of environment defaults.
    ///
    /// Environment values go through the same checks as their flags; an
    /// empty variable counts as unset.
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let mut quiz_file = lookup("QUIZ_FILE")
            .map(|value| parse_quiz_file(value, "QUIZ_FILE"))
            .transpose()?;
        let mut quiz_id = lookup("QUIZ_ID")
            .map(|value| parse_quiz_id(value, "QUIZ_ID"))
            .transpose()?;
        let mut tick_period = lookup("QUIZ_TICK_MS")
            .map(|value| parse_tick_ms(value, "QUIZ_TICK_MS"))
            .transpose()?
            .unwrap_or(TICK_PERIOD);
        let mut list = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--quiz" => {
                    let value = require_value(args, "--quiz")?;
                    quiz_file = Some(parse_quiz_file(value, "--quiz")?);
                }
                "--quiz-id" => {
                    let value = require_value(args, "--quiz-id")?;
                    quiz_id = Some(parse_quiz_id(value, "--quiz-id")?);
                }
                "--tick-ms" => {
                    let value = require_value(args, "--tick-ms")?;
                    tick_period = parse_tick_ms(value, "--tick-ms")?;
                }
                "--list" => list = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            quiz_file,
            quiz_id,
            list,
            tick_period,
        })
    }
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| err.to_string())?;
    Ok(())
}

/// Build the catalogue and pick the quiz to run.
///
/// A quiz file replaces the built-in catalogue; its own id is used unless
/// `--quiz-id` says otherwise.
fn load_catalogue(args: &Args) -> Result<(InMemoryRepository, QuizId), Box<dyn std::error::Error>> {
    let Some(path) = &args.quiz_file else {
        let repo = InMemoryRepository::with_sample_data()?;
        return Ok((repo, args.quiz_id.unwrap_or(CORPORATE_ETHICS_ID)));
    };

    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    let quiz: QuizDefinition = serde_json::from_str(&raw)
        .map_err(|err| format!("invalid quiz in {}: {err}", path.display()))?;
    let quiz_id = args.quiz_id.unwrap_or_else(|| quiz.id());

    let repo = InMemoryRepository::new();
    repo.insert_quiz(quiz)?;
    Ok((repo, quiz_id))
}

async fn execute(
    service: &AttemptLoopService,
    session: &AttemptSession,
    command: Command,
    ticker: &mut Option<TickerHandle>,
) -> Result<(), AttemptServiceError> {
    match command {
        Command::Start => *ticker = Some(service.start(session).await?),
        Command::Next => session.next().await?,
        Command::Previous => session.previous().await?,
        Command::GoTo(number) => session.go_to_question(number - 1).await?,
        Command::Answer(number) => session.record_current_answer(number - 1).await?,
        Command::Camera => {
            let enabled = session.toggle_camera().await;
            println!("Camera {}.", if enabled { "on" } else { "off" });
        }
        Command::Acknowledge => session.acknowledge_warning().await,
        Command::Show => {}
        Command::Finish => {
            // the Finished event ends the input loop
            session.finish().await?;
            return Ok(());
        }
        Command::Help | Command::Quit => {
            println!("{HELP}");
            return Ok(());
        }
    }

    if session.phase().await == Phase::InProgress {
        println!("{}", console::render_question(&session.view().await));
    }
    Ok(())
}

/// Drive the attempt from stdin until it finishes or the user leaves.
///
/// Returns `true` when the attempt was submitted, by the user or by timeout.
async fn interact(
    service: &AttemptLoopService,
    session: &AttemptSession,
    mut events: UnboundedReceiver<AttemptEvent>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker: Option<TickerHandle> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(false);
                };
                match line.parse::<Command>() {
                    Ok(Command::Quit) => return Ok(false),
                    Ok(command) => {
                        if let Err(err) = execute(service, session, command, &mut ticker).await {
                            println!("{err}");
                        }
                    }
                    Err(CommandError::Empty) => {}
                    Err(err) => println!("{err}"),
                }
            }
            Some(event) = events.recv() => match event {
                AttemptEvent::WarningRaised { message } => {
                    println!("! {message} (type `ack` to dismiss)");
                }
                AttemptEvent::Finished { auto_submitted, .. } => {
                    if auto_submitted {
                        println!("Time is up.");
                    }
                    if let Some(ticker) = ticker.take() {
                        ticker.join().await;
                    }
                    return Ok(true);
                }
                AttemptEvent::Started { .. } | AttemptEvent::CameraToggled { .. } => {}
            },
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing()?;

    let (repo, quiz_id) = load_catalogue(&args)?;
    let (sink, events) = ChannelSink::new();
    let service = AttemptLoopService::new(Clock::default_clock(), Storage::from_repository(repo))
    .with_sink(Arc::new(sink))
    .with_tick_period(args.tick_period);

    let catalogue = service.list_quizzes().await?;
    if args.list {
        print!("{}", console::render_catalogue(&catalogue));
        return Ok(());
    }

    let item = catalogue
        .iter()
        .find(|item| item.id == quiz_id)
        .ok_or_else(|| format!("no quiz with id {quiz_id}"))?;
    let session = service.open_attempt(quiz_id).await?;
    println!(
        "{}",
        console::render_intro(item, session.view().await.camera_enabled)
    );

    if !interact(&service, &session, events).await? {
        println!("Attempt abandoned; nothing was recorded.");
        return Ok(());
    }

    if let Some(result) = session.result_view().await {
        println!("{}", console::render_result(&result));
    }
    service.finalize_summary(&session).await?;
    let history = service.recent_results(quiz_id, 5).await?;
    println!("{}", console::render_history(&history));
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
