use std::path::PathBuf;

use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use wordladder::config::{AppConfig, DEFAULT_LOG_FILTER};
use wordladder::db::Database;
use wordladder::models::{
    CreateRoundInput, CreateWordInput, Grade, RecordReviewInput, RoundWordTarget, SessionResult,
    SessionType, UpdateSettingsInput,
};
use wordladder::{StudyError, StudyService};

#[derive(Parser)]
#[command(name = "wordladder")]
#[command(about = "Round-based spaced-repetition vocabulary study")]
struct Cli {
    /// Database file (overrides WORDLADDER_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Learner id (overrides WORDLADDER_USER)
    #[arg(long, global = true)]
    user: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a word to the vocabulary
    AddWord {
        text: String,
        #[arg(short, long, default_value = "en")]
        language: String,
        #[arg(short, long)]
        note: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        priority: bool,
    },
    /// List all words
    Words,
    /// Show one word with its status, counters and review totals
    Word { word_id: Uuid },
    /// Create a round from word ids
    CreateRound {
        name: String,
        #[arg(required = true)]
        word_ids: Vec<Uuid>,
    },
    /// List rounds, or show one round's progress
    Rounds { round_id: Option<Uuid> },
    /// Open (or resume) a session for a round
    StartSession {
        round_id: Uuid,
        #[arg(long, value_enum, default_value = "normal")]
        kind: KindArg,
    },
    /// Finish a session with `word_id=known|fuzzy|unknown` outcomes
    FinishSession {
        session_id: Uuid,
        results: Vec<String>,
    },
    /// Override a word's standing in a round
    EditStatus {
        round_id: Uuid,
        word_id: Uuid,
        #[arg(value_enum)]
        target: TargetArg,
    },
    /// Record a fixed-interval review
    Review {
        word_id: Uuid,
        #[arg(value_enum)]
        grade: GradeArg,
        #[arg(long)]
        revealed: bool,
    },
    /// Words due for fixed-interval review
    Due {
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Memory rating for a word
    Rating { word_id: Uuid },
    /// Daily review counts as a week grid
    Heatmap {
        #[arg(short, long, default_value = "365")]
        days: u32,
    },
    /// Show or change study settings
    Settings {
        #[arg(long)]
        session_size: Option<u32>,
        #[arg(long)]
        freeze_rounds: Option<u32>,
        #[arg(long)]
        auto_play_audio: Option<bool>,
        #[arg(long)]
        require_consecutive_known: Option<bool>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Normal,
    Extra,
}

#[derive(Clone, Copy, ValueEnum)]
enum GradeArg {
    Known,
    Fuzzy,
    Unknown,
}

#[derive(Clone, Copy, ValueEnum)]
enum TargetArg {
    FirstTryMastered,
    Mastered,
    Fuzzy,
    Unknown,
}

impl From<KindArg> for SessionType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Normal => SessionType::Normal,
            KindArg::Extra => SessionType::Extra,
        }
    }
}

impl From<GradeArg> for Grade {
    fn from(grade: GradeArg) -> Self {
        match grade {
            GradeArg::Known => Grade::Known,
            GradeArg::Fuzzy => Grade::Fuzzy,
            GradeArg::Unknown => Grade::Unknown,
        }
    }
}

impl From<TargetArg> for RoundWordTarget {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::FirstTryMastered => RoundWordTarget::FirstTryMastered,
            TargetArg::Mastered => RoundWordTarget::Mastered,
            TargetArg::Fuzzy => RoundWordTarget::Fuzzy,
            TargetArg::Unknown => RoundWordTarget::Unknown,
        }
    }
}

/// Initialize tracing on stderr so stdout carries only command output
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_result(raw: &str) -> anyhow::Result<SessionResult> {
    let (id, grade) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected word_id=grade, got '{raw}'"))?;
    let word_id = Uuid::parse_str(id.trim()).with_context(|| format!("invalid word id '{id}'"))?;
    let outcome = Grade::from_str(grade.trim())
        .ok_or_else(|| anyhow!("grade must be known, fuzzy or unknown, got '{grade}'"))?;
    Ok(SessionResult::new(word_id, outcome))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Err(err) => match err.downcast_ref::<StudyError>() {
            Some(study_err) if study_err.is_user_facing() => {
                eprintln!("error: {study_err}");
                std::process::exit(1);
            }
            _ => Err(err),
        },
        ok => ok,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?.with_overrides(cli.db, cli.user);
    tracing::debug!("Using database {}", config.db_path.display());

    let db = Database::open(config.db_path)?;
    db.migrate()?;
    let study = StudyService::new(db, config.user_id);

    match cli.command {
        Commands::AddWord {
            text,
            language,
            note,
            category,
            priority,
        } => {
            let input = CreateWordInput {
                note,
                category,
                is_priority: priority,
                ..CreateWordInput::new(text, language)
            };
            print_json(&study.add_word(input)?)?;
        }
        Commands::Words => print_json(&study.list_words()?)?,
        Commands::Word { word_id } => {
            print_json(&serde_json::json!({
                "word": study.get_word(word_id)?,
                "status": study.word_status(word_id)?,
                "state": study.review_state(word_id)?,
                "stats": study.word_stats(word_id)?,
            }))?;
        }
        Commands::CreateRound { name, word_ids } => {
            print_json(&study.create_round(CreateRoundInput { name, word_ids })?)?;
        }
        Commands::Rounds { round_id: None } => print_json(&study.list_rounds()?)?,
        Commands::Rounds {
            round_id: Some(id),
        } => print_json(&study.round_progress(id)?)?,
        Commands::StartSession { round_id, kind } => {
            print_json(&study.start_session(round_id, kind.into())?)?;
        }
        Commands::FinishSession {
            session_id,
            results,
        } => {
            let results = results
                .iter()
                .map(|raw| parse_result(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;
            print_json(&study.finish_session(session_id, results)?)?;
        }
        Commands::EditStatus {
            round_id,
            word_id,
            target,
        } => {
            print_json(&study.edit_round_word_status(round_id, word_id, target.into())?)?;
        }
        Commands::Review {
            word_id,
            grade,
            revealed,
        } => {
            let input = RecordReviewInput {
                word_id,
                grade: grade.into(),
                revealed_answer: revealed,
            };
            print_json(&study.record_review(input, Utc::now())?)?;
        }
        Commands::Due { limit } => print_json(&study.due_words(Utc::now(), limit)?)?,
        Commands::Rating { word_id } => print_json(&study.memory_rating(word_id, Utc::now())?)?,
        Commands::Heatmap { days } => {
            print_json(&study.activity_heatmap(days, Utc::now().date_naive())?)?;
        }
        Commands::Settings {
            session_size,
            freeze_rounds,
            auto_play_audio,
            require_consecutive_known,
        } => {
            let input = UpdateSettingsInput {
                session_size,
                freeze_rounds,
                auto_play_audio,
                require_consecutive_known,
            };
            let settings = if input.session_size.is_none()
                && input.freeze_rounds.is_none()
                && input.auto_play_audio.is_none()
                && input.require_consecutive_known.is_none()
            {
                study.settings()?
            } else {
                study.update_settings(input)?
            };
            print_json(&settings)?;
        }
    }

    Ok(())
}
