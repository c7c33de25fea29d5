use std::fmt;
use std::sync::Arc;

use quiz_core::model::{AnswerResult, WordMasteryId};
use quiz_core::progression::Transition;
use quiz_core::timer::TimerCue;
use services::api::CompletionSummary;
use services::{
    ApiConfig, EngineConfig, EngineEvent, HttpQuizApi, SessionEngine, SessionError, SoundEffect,
    SoundEffects, SpeechPlayer, SubmitStatus, TimerKind,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingAccessCode,
    MissingApi,
    InvalidSessionLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingAccessCode => {
                write!(f, "an access code is required (--code or QUIZ_ACCESS_CODE)")
            }
            ArgsError::MissingApi => {
                write!(f, "a service url is required (--api or QUIZ_API_BASE_URL)")
            }
            ArgsError::InvalidSessionLimit { raw } => {
                write!(f, "invalid --session-limit value: {raw}")
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- --code <access-code> [--api <url>] [--session-limit <secs>]");
    eprintln!();
    eprintln!("Answer with a choice number or by typing the word.");
    eprintln!("Press enter on a result to continue; type :q to finish the session.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_ACCESS_CODE, QUIZ_API_BASE_URL, QUIZ_API_TIMEOUT_SECS, RUST_LOG");
}

struct Args {
    access_code: String,
    api: ApiConfig,
    session_limit: Option<u32>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut access_code = std::env::var("QUIZ_ACCESS_CODE")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let mut api = ApiConfig::from_env();
        let mut session_limit = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--code" => access_code = Some(require_value(args, "--code")?),
                "--api" => {
                    let value = require_value(args, "--api")?;
                    let timeout = api.as_ref().map(ApiConfig::timeout);
                    let config = ApiConfig::new(value)?;
                    api = Some(match timeout {
                        Some(timeout) => config.with_timeout(timeout),
                        None => config,
                    });
                }
                "--session-limit" => {
                    let value = require_value(args, "--session-limit")?;
                    let secs: u32 = value
                        .parse()
                        .ok()
                        .filter(|secs| *secs > 0)
                        .ok_or(ArgsError::InvalidSessionLimit { raw: value.clone() })?;
                    session_limit = Some(secs);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg).into()),
            }
        }

        Ok(Self {
            access_code: access_code.ok_or(ArgsError::MissingAccessCode)?,
            api: api.ok_or(ArgsError::MissingApi)?,
            session_limit,
        })
    }
}

//
// ─── CONSOLE FEEDBACK ──────────────────────────────────────────────────────────
//

/// Speech has no console rendering; the cue is logged.
struct LoggedSpeech;

impl SpeechPlayer for LoggedSpeech {
    fn play_word(&self, word: &str) {
        debug!(word, "speak word");
    }

    fn play_sentence(&self, sentence: &str) {
        debug!(sentence, "speak sentence");
    }
}

struct TerminalBell;

impl SoundEffects for TerminalBell {
    fn play(&self, effect: SoundEffect) {
        if matches!(effect, SoundEffect::TimerFinal) {
            eprint!("\x07");
        }
        debug!(effect = effect.name(), "play");
    }

    fn stop(&self, effect: SoundEffect) {
        debug!(effect = effect.name(), "stop");
    }
}

//
// ─── CONSOLE LOOP ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Console {
    engine: SessionEngine,
    shown: Option<WordMasteryId>,
}

impl Console {
    fn show_question_if_new(&mut self) {
        if self.engine.is_locked() {
            return;
        }
        let Some(question) = self.engine.current_question() else {
            if self.shown.take().is_some() {
                println!("(waiting for more questions)");
            }
            return;
        };
        if self.shown == Some(question.word_mastery_id) {
            return;
        }
        self.shown = Some(question.word_mastery_id);

        println!();
        println!("[{}] {}", question.tier, question.prompt_data.word);
        if let Some(meaning) = &question.prompt_data.meaning {
            println!("    {meaning}");
        }
        if let Some(sentence) = &question.prompt_data.sentence {
            println!("    \"{sentence}\"");
        }
        for (index, choice) in question.choices.iter().enumerate() {
            println!("  {}. {choice}", index + 1);
        }
    }

    /// Map a typed line to the answer text; numbers pick a choice.
    fn resolve_answer(&self, line: &str) -> String {
        let choices = self
            .engine
            .current_question()
            .map(|question| question.choices.as_slice())
            .unwrap_or_default();
        line.parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| choices.get(index))
            .cloned()
            .unwrap_or_else(|| line.to_owned())
    }

    async fn on_line(&mut self, line: &str) -> Result<Flow, SessionError> {
        if line == ":q" {
            return Ok(Flow::Quit);
        }
        if self.engine.is_locked() {
            if line.is_empty() {
                self.engine.advance()?;
                self.show_question_if_new();
            }
            return Ok(Flow::Continue);
        }

        let answer = self.resolve_answer(line);
        match self.engine.answer(&answer).await {
            Ok(SubmitStatus::Committed(result)) => print_result(&result, self.engine.score()),
            Ok(SubmitStatus::Ignored) => {}
            Err(SessionError::ValidationRejected(err)) => println!("{err}"),
            Err(err) if err.is_retryable() => println!("{err}; try again"),
            Err(err) => return Err(err),
        }
        Ok(Flow::Continue)
    }

    async fn on_event(&mut self, event: EngineEvent) -> Result<Flow, SessionError> {
        match event {
            EngineEvent::Cue {
                kind: TimerKind::Question,
                cue: TimerCue::Warning,
            } => {
                let left = self.engine.question_timer().seconds_left;
                println!("  ({left}s left)");
            }
            EngineEvent::QuestionTimedOut => {
                println!("  time's up");
                if let SubmitStatus::Committed(result) = self.engine.submit_timeout().await? {
                    print_result(&result, self.engine.score());
                }
            }
            EngineEvent::SessionTimeUp => {
                println!("session time is over");
                return Ok(Flow::Quit);
            }
            EngineEvent::PrefetchSettled(_) => self.show_question_if_new(),
            EngineEvent::Idle => return Ok(Flow::Quit),
            EngineEvent::Tick { .. } | EngineEvent::Cue { .. } => {}
        }
        Ok(Flow::Continue)
    }
}

fn print_result(result: &AnswerResult, score: i64) {
    if result.is_correct {
        println!("  correct (+{})", result.score_delta);
    } else if result.almost_correct {
        println!("  almost ({})", result.score_delta);
    } else {
        match &result.correct_answer {
            Some(answer) => println!("  wrong, answer: {answer} ({})", result.score_delta),
            None => println!("  wrong ({})", result.score_delta),
        }
    }
    if result.mastered {
        println!("  word mastered");
    }
    match result.transition {
        Some(Transition::Up) => println!("  up to {}", result.tier_after),
        Some(Transition::Down) => println!("  down to {}", result.tier_after),
        None => {}
    }
    if result.combo.combo >= 3 {
        println!("  combo x{}", result.combo.combo);
    }
    println!("  score {score}, press enter");
}

fn print_summary(summary: &CompletionSummary) {
    println!();
    println!(
        "Answered {} ({} correct, {:.0}% accuracy)",
        summary.total_answered,
        summary.correct_count,
        summary.accuracy * 100.0
    );
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).inspect_err(|err| {
        eprintln!("{err}");
        print_usage();
    })?;

    let api = Arc::new(HttpQuizApi::new(args.api)?);
    let config = EngineConfig::default().with_session_time_limit(args.session_limit);
    let engine = SessionEngine::new(api, config)
        .with_speech(Arc::new(LoggedSpeech))
        .with_sounds(Arc::new(TerminalBell));
    let mut console = Console {
        engine,
        shown: None,
    };

    let session = console.engine.start(&args.access_code).await?;
    info!(session = %session.id(), "connected");
    println!("Hello, {}!", session.student_name());
    console.show_question_if_new();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let flow = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => console.on_line(line.trim()).await?,
                None => Flow::Quit,
            },
            event = console.engine.next_event() => console.on_event(event).await?,
        };
        if flow == Flow::Quit {
            break;
        }
    }

    let summary = console.engine.complete().await?;
    print_summary(&summary);
    console.engine.exit();
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
