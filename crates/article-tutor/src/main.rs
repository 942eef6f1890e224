//! A terminal front end for the article tutor.
//!
//! Settings are read from the environment: `TUTOR_BACKEND` (`ollama` or
//! `gemini`), `GOOGLE_API_KEY`, `OLLAMA_URL`, `TUTOR_MODEL`, and
//! `TUTOR_SPEAK=1` to read replies aloud.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use article_tutor::core::{AnalysisResult, Settings, SettingsStore};
use article_tutor::render::sanitize;
use article_tutor::speech::CommandSpeaker;
use article_tutor::{Session, SessionBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::fs;
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tokio::time::sleep;
use tutor_model::ModelMessage;

const BAR_CHAR: &str = "▎";
const END_OF_ARTICLE: &str = ".";

type Input = Lines<BufReader<Stdin>>;

enum Command<'a> {
    Quit,
    History,
    Help,
    Analyze(&'a str),
    Starter(usize),
    Message(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Command::Message(line));
        };

        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(name, arg)| (name, arg.trim()))
            .unwrap_or((command, ""));
        let command = match name {
            "quit" | "exit" | "q" => Command::Quit,
            "history" => Command::History,
            "analyze" => Command::Analyze(arg),
            _ => match name.parse::<usize>() {
                Ok(number) if number > 0 => Command::Starter(number - 1),
                _ => Command::Help,
            },
        };
        Some(command)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = SettingsStore::new(settings_from_env());
    debug!("settings: {:?}", settings.snapshot());

    let mut builder = SessionBuilder::new().with_settings(settings);
    if env::var("TUTOR_SPEAK").is_ok_and(|value| value == "1") {
        match CommandSpeaker::detect() {
            Some(speaker) => {
                info!("reading replies with {}", speaker.program().display());
                builder = builder.with_speaker(speaker);
            }
            None => eprintln!(
                "{}",
                "No text-to-speech command found, speech is disabled."
                    .yellow()
            ),
        }
    }
    let session = builder.build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let mut input = BufReader::new(io::stdin()).lines();

    print_history(&session);

    let article = match env::args().nth(1) {
        Some(path) => read_article_file(&path).await,
        None => {
            println!(
                "Paste the article, then finish with a line containing \
                 only `{END_OF_ARTICLE}`:"
            );
            read_article(&mut input).await
        }
    };
    if let Some(article) = article {
        analyze(&session, &progress_style, article).await;
    }
    print_help();

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut input).await else {
            break;
        };
        let Some(command) = Command::parse(&line) else {
            continue;
        };

        match command {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::History => print_history(&session),
            Command::Analyze(path) => {
                if let Some(article) = read_article_file(path).await {
                    analyze(&session, &progress_style, article).await;
                }
            }
            Command::Starter(index) => {
                if !check_ready(&session) {
                    continue;
                }
                let reply = with_spinner(
                    &progress_style,
                    "🤔 Thinking...",
                    session.send_starter(index),
                )
                .await;
                print_reply(reply);
            }
            Command::Message(text) => {
                if !check_ready(&session) {
                    continue;
                }
                let reply = with_spinner(
                    &progress_style,
                    "🤔 Thinking...",
                    session.send_message(text),
                )
                .await;
                print_reply(reply);
            }
        }
    }

    session.stop_speaking();
}

fn settings_from_env() -> Settings {
    let mut settings = Settings::default();
    if let Ok(backend) = env::var("TUTOR_BACKEND") {
        settings.backend = backend;
    }
    if let Ok(api_key) = env::var("GOOGLE_API_KEY") {
        settings.api_key = api_key;
    }
    if let Ok(url) = env::var("OLLAMA_URL") {
        settings.url = url;
    }
    settings.model = env::var("TUTOR_MODEL").ok();
    settings
}

async fn analyze(session: &Session, style: &ProgressStyle, article: String) {
    let result =
        with_spinner(style, "📖 Reading the article...", session.analyze(article))
            .await;
    print_analysis(&result);
}

async fn with_spinner<F: Future>(
    style: &ProgressStyle,
    message: &'static str,
    fut: F,
) -> F::Output {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(style.clone());
    progress_bar.set_message(message);

    let mut fut = pin!(fut);
    loop {
        progress_bar.inc(1);
        select! {
            output = &mut fut => {
                // Finish the progress bar before printing anything else.
                progress_bar.finish_and_clear();
                return output;
            }
            _ = sleep(Duration::from_millis(100)) => {}
        }
    }
}

fn check_ready(session: &Session) -> bool {
    let state = session.tutor().state();
    if state.is_ready() {
        return true;
    }
    let hint = if state.is_analysis_loading() {
        "The article is still being analyzed."
    } else {
        "Analyze an article first with `/analyze <file>`."
    };
    println!("{}", hint.yellow());
    false
}

fn print_analysis(result: &AnalysisResult) {
    let bar = BAR_CHAR.bright_green();
    println!("\n{bar}{}", "Summary".bold());
    println!("{bar}{}", sanitize(&result.summary).bright_white());
    if result.starters.is_empty() {
        println!();
        return;
    }
    println!("{bar}");
    println!("{bar}{}", "Conversation starters".bold());
    for (index, starter) in result.starters.iter().enumerate() {
        println!(
            "{bar}{} {}",
            format!("/{}", index + 1).bright_cyan(),
            sanitize(starter)
        );
    }
    println!();
}

fn print_reply<E: std::fmt::Display>(reply: Result<String, E>) {
    match reply {
        Ok(reply) => println!(
            "{}🤖 {}",
            BAR_CHAR.bright_cyan(),
            sanitize(&reply).bright_white()
        ),
        Err(err) => println!("{}", err.to_string().yellow()),
    }
}

fn print_history(session: &Session) {
    let state = session.tutor().state();
    for msg in state.history() {
        let text = sanitize(msg.content());
        match msg {
            ModelMessage::User(_) => {
                println!("{}🧑 {}", BAR_CHAR.bright_yellow(), text)
            }
            ModelMessage::Assistant(_) => println!(
                "{}🤖 {}",
                BAR_CHAR.bright_cyan(),
                text.bright_white()
            ),
            ModelMessage::System(_) => {}
        }
    }
}

fn print_help() {
    println!(
        "{}",
        "Type a message to chat. Commands: /1../3 send a starter, \
         /analyze <file>, /history, /quit."
            .dimmed()
    );
}

async fn read_article_file(path: &str) -> Option<String> {
    if path.is_empty() {
        println!("{}", "Usage: /analyze <file>".yellow());
        return None;
    }
    match fs::read_to_string(path).await {
        Ok(article) if article.trim().is_empty() => {
            println!("{}", format!("{path} is empty.").yellow());
            None
        }
        Ok(article) => Some(article),
        Err(err) => {
            println!("{}", format!("Cannot read {path}: {err}").yellow());
            None
        }
    }
}

async fn read_article(input: &mut Input) -> Option<String> {
    let mut article = String::new();
    while let Some(line) = read_line(input).await {
        if line.trim() == END_OF_ARTICLE {
            break;
        }
        article.push_str(&line);
        article.push('\n');
    }
    let article = article.trim();
    (!article.is_empty()).then(|| article.to_owned())
}

async fn read_line(input: &mut Input) -> Option<String> {
    match input.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
