use std::fmt;

use course_core::FINAL_STEP;
use course_core::model::{Article, DiaryLink};
use storage::repository::Storage;

const ARTICLE_TITLES: [&str; 10] = [
    "Why the first step matters",
    "Keeping a step diary",
    "Handling the urge to rush ahead",
    "What to do when you slip",
    "Building the daily check-in habit",
    "Reading your own diary",
    "The first week in review",
    "Pacing yourself for the long stretch",
    "When motivation dips",
    "From daily steps to every other day",
];

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    base_url: String,
    articles: u8,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidBaseUrl { raw: String },
    InvalidArticles { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidBaseUrl { raw } => write!(f, "invalid --base-url value: {raw}"),
            ArgsError::InvalidArticles { raw } => {
                write!(f, "invalid --articles value (expected 0..=50): {raw}")
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("COURSE_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut base_url =
            std::env::var("COURSE_BASE_URL").unwrap_or_else(|_| "https://telegra.ph".into());
        let mut articles = std::env::var("COURSE_ARTICLES")
            .ok()
            .and_then(|value| value.parse::<u8>().ok())
            .filter(|n| *n <= FINAL_STEP)
            .unwrap_or(10);

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--base-url" => {
                    let value = require_value(&mut args, "--base-url")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidBaseUrl { raw: value });
                    }
                    base_url = value;
                }
                "--articles" => {
                    let value = require_value(&mut args, "--articles")?;
                    articles = value
                        .parse::<u8>()
                        .ok()
                        .filter(|n| *n <= FINAL_STEP)
                        .ok_or(ArgsError::InvalidArticles { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            base_url,
            articles,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --base-url <url>          Base URL for step pages (default: https://telegra.ph)");
    eprintln!("  --articles <n>            Steps 1..=n get a companion article (default: 10)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  COURSE_DB_URL, COURSE_BASE_URL, COURSE_ARTICLES");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let base = args.base_url.trim_end_matches('/');

    for step in 1..=FINAL_STEP {
        let link = DiaryLink::new(step, &format!("{base}/step-diary-{step:02}"))?;
        storage.content.upsert_diary_link(&link).await?;
    }

    for step in 1..=args.articles {
        let title = ARTICLE_TITLES
            .get(usize::from(step) - 1)
            .map_or_else(|| format!("Companion notes for step {step}"), |t| (*t).into());
        let article = Article::new(step, title, &format!("{base}/step-notes-{step:02}"))?;
        storage.content.upsert_article(&article).await?;
    }

    println!(
        "Seeded {} diary links and {} articles into {}",
        FINAL_STEP, args.articles, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
