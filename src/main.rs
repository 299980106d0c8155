use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use quiz_exam::config::AppDirs;
use quiz_exam::{
    ConfigStore, FileConfigStore, FileQuestionSource, FileStore, HttpQuestionSource,
    MemoryStore, QuestionSource, Quiz, SessionStore,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Question bank URL
    #[arg(short, long, conflicts_with = "questions")]
    endpoint: Option<String>,

    /// Read questions from a local JSON file instead of the endpoint
    #[arg(short, long)]
    questions: Option<PathBuf>,

    /// File the session is saved to
    #[arg(short, long, conflicts_with = "ephemeral")]
    store: Option<PathBuf>,

    /// Keep the session in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Seconds on the clock for a new attempt
    #[arg(short, long)]
    time_limit: Option<u32>,

    /// Show whether an answer is correct as soon as it is chosen
    #[arg(long)]
    reveal_answers: bool,

    /// Config file to read
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file (the terminal is taken by the quiz)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_tracing(path: &Path) -> Option<WorkerGuard> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path.file_name()?;
    std::fs::create_dir_all(dir).ok()?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let filter = EnvFilter::try_from_env("QUIZ_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();

    Some(guard)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_path = args.log_file.clone().unwrap_or_else(AppDirs::log_path);
    let _log_guard = init_tracing(&log_path);

    let config_store = match &args.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let mut config = config_store.load();

    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(store) = args.store {
        config.store_path = Some(store);
    }
    if let Some(time_limit) = args.time_limit {
        config.time_limit_secs = time_limit;
    }
    config.reveal_answers |= args.reveal_answers;

    let store: Arc<dyn SessionStore> = if args.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(config.resolved_store_path()))
    };

    let source: Arc<dyn QuestionSource> = match args.questions {
        Some(path) => Arc::new(FileQuestionSource::new(path)),
        None => Arc::new(HttpQuestionSource::new(config.endpoint.clone())),
    };

    tracing::info!(endpoint = %config.endpoint, time_limit = config.time_limit_secs, "starting quiz");

    if let Err(e) = Quiz::new(config, store, source).run().await {
        eprintln!("Error running quiz: {}", e);
        std::process::exit(1);
    }
}
