//! Line-oriented terminal front end: command parsing and plain-text rendering.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use quiz_core::time::format_countdown;
use services::{AttemptView, QuizListItem, ResultView, SummaryListItem};

/// One line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Next,
    Previous,
    /// 1-based question number as typed.
    GoTo(usize),
    /// 1-based option number as typed.
    Answer(usize),
    Camera,
    Acknowledge,
    Show,
    Finish,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingNumber { command: &'static str },
    InvalidNumber { raw: String },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "type a command, or `help`"),
            CommandError::Unknown(raw) => write!(f, "unknown command: {raw}"),
            CommandError::MissingNumber { command } => write!(f, "{command} requires a number"),
            CommandError::InvalidNumber { raw } => write!(f, "not a number from 1 upwards: {raw}"),
        }
    }
}

impl std::error::Error for CommandError {}

fn parse_number(raw: Option<&str>, command: &'static str) -> Result<usize, CommandError> {
    let raw = raw.ok_or(CommandError::MissingNumber { command })?;
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(CommandError::InvalidNumber { raw: raw.to_owned() }),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(CommandError::Empty);
        };
        let command = match head.to_ascii_lowercase().as_str() {
            "start" | "s" => Command::Start,
            "next" | "n" => Command::Next,
            "prev" | "previous" | "p" => Command::Previous,
            "goto" | "g" => Command::GoTo(parse_number(parts.next(), "goto")?),
            "answer" | "a" => Command::Answer(parse_number(parts.next(), "answer")?),
            "camera" | "c" => Command::Camera,
            "ack" | "ok" => Command::Acknowledge,
            "show" => Command::Show,
            "finish" | "submit" => Command::Finish,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            _ => return Err(CommandError::Unknown(head.to_owned())),
        };
        Ok(command)
    }
}

pub const HELP: &str = "\
Commands:
  start            begin the attempt (camera must be on for proctored quizzes)
  next | prev      move between questions
  goto <n>         jump to question n
  answer <n>       choose option n for the current question
  camera           toggle the proctoring camera
  ack              dismiss the proctoring warning
  show             redraw the current question
  finish           submit the attempt
  quit             leave without submitting";

#[must_use]
pub fn render_catalogue(items: &[QuizListItem]) -> String {
    let mut out = String::from("Available quizzes:\n");
    for item in items {
        let _ = writeln!(
            out,
            "  [{}] {} ({} questions, {} min, pass {}%{})",
            item.id,
            item.title,
            item.question_count,
            item.duration_secs / 60,
            item.passing_threshold,
            if item.proctored { ", proctored" } else { "" }
        );
    }
    out
}

#[must_use]
pub fn render_intro(item: &QuizListItem, camera_enabled: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", item.title);
    if !item.description.is_empty() {
        let _ = writeln!(out, "{}", item.description);
    }
    let _ = writeln!(
        out,
        "{} questions, {} to complete, {}% to pass.",
        item.question_count,
        format_countdown(item.duration_secs),
        item.passing_threshold
    );
    if let Some(until) = item.available_until {
        let _ = writeln!(out, "Open until {}.", until.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(allowed) = item.attempts_allowed {
        let _ = writeln!(out, "Attempts allowed: {allowed}.");
    }
    if item.proctored {
        let _ = writeln!(
            out,
            "This quiz is proctored. Camera: {}.",
            if camera_enabled { "on" } else { "off" }
        );
    }
    out.push_str("Type `start` to begin or `help` for commands.");
    out
}

#[must_use]
pub fn render_question(view: &AttemptView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[{}{}] question {}/{}  answered {}/{} ({:.0}%)  camera {}",
        format_countdown(view.remaining_secs),
        if view.time_low { " LOW" } else { "" },
        view.question_number,
        view.total_questions,
        view.answered_count,
        view.total_questions,
        view.progress_percent,
        if view.camera_enabled { "on" } else { "off" },
    );
    let _ = writeln!(out, "{}", view.question_text);
    for option in &view.options {
        let marker = if option.selected { '*' } else { ' ' };
        let _ = writeln!(out, " {marker} {}. {}", option.index + 1, option.label);
    }
    let navigator: Vec<String> = view
        .navigator
        .iter()
        .map(|item| {
            let number = item.index + 1;
            match (item.current, item.answered) {
                (true, _) => format!("[{number}]"),
                (false, true) => format!("{number}+"),
                (false, false) => number.to_string(),
            }
        })
        .collect();
    let _ = write!(out, "Questions: {}", navigator.join(" "));
    if let Some(warning) = &view.pending_warning {
        let _ = write!(out, "\n! {warning} (type `ack` to dismiss)");
    }
    out
}

#[must_use]
pub fn render_result(view: &ResultView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}: {}%", view.quiz_title, view.score_percent);
    let _ = writeln!(
        out,
        "{} of {} correct, {} answered, time taken {}.",
        view.correct,
        view.total_questions,
        view.answered,
        format_countdown(view.time_taken_secs)
    );
    if view.auto_submitted {
        let _ = writeln!(out, "Time ran out; the attempt was submitted automatically.");
    }
    let verdict = if view.passed {
        "Passed"
    } else {
        "Not passed"
    };
    let _ = write!(out, "{verdict} (pass mark {}%).", view.passing_threshold);
    out
}

#[must_use]
pub fn render_history(items: &[SummaryListItem]) -> String {
    let mut out = String::from("Recent results:");
    for item in items {
        let _ = write!(
            out,
            "\n  #{} {} {}% ({}/{}){}",
            item.id,
            item.completed_at.format("%Y-%m-%d %H:%M"),
            item.score_percent,
            item.correct,
            item.total,
            if item.passed { " passed" } else { "" }
        );
    }
    out
}
