use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sentinel_brain::audit::ModLog;
use sentinel_brain::bot::Bot;
use sentinel_brain::executor::CommandExecutor;
use sentinel_brain::moderation::CommunityGateway;
use sentinel_brain::qa::QaPipeline;
use sentinel_brain::schedule::ScheduleService;
use sentinel_core::config::Config;
use sentinel_core::error::{Result, SentinelError};
use sentinel_llm::openai::{OpenAiEmbedding, OpenAiLlm};
use sentinel_scheduler::runtime::SchedulerRuntime;
use sentinel_scheduler::store::JobStore;
use sentinel_telegram::bot::TelegramBot;
use sentinel_vector::index::VectorIndex;

#[tokio::main]
async fn main() {
    let config_path =
        std::env::var("SENTINEL_CONFIG").unwrap_or_else(|_| "sentinel.toml".to_string());

    let config = Config::load(Path::new(&config_path)).unwrap_or_else(|e| {
        eprintln!("fatal: failed to load config: {e}");
        std::process::exit(1);
    });

    if config.telegram.token.is_empty() {
        eprintln!("fatal: SENTINEL_TELEGRAM_TOKEN is not set");
        std::process::exit(1);
    }

    eprintln!("sentinel: starting...");

    // One connection pool shared by every provider client: clients are
    // built once here and injected, never rebuilt per request.
    let http = reqwest::Client::new();

    let telegram = Arc::new(TelegramBot::new(http.clone(), &config.telegram.token));

    let embedder = OpenAiEmbedding::new(
        http.clone(),
        config.embedding.api_key.clone(),
        config.embedding.model.clone(),
        config.embedding.dimensions,
    );
    let llm = OpenAiLlm::new(
        http.clone(),
        config.completion.api_key.clone(),
        config.completion.model.clone(),
    );
    let index = VectorIndex::new(
        http.clone(),
        config.vector.index_url.clone(),
        config.vector.api_key.clone(),
        config.vector.namespace.clone(),
    );
    let qa = QaPipeline::new(
        embedder,
        index,
        llm,
        config.qa.clone(),
        config.completion.clone(),
        config.vector.top_k,
    );

    // Job store for the command surface
    let store = open_store(&config.database.path).await.unwrap_or_else(|e| {
        eprintln!("fatal: failed to open job store: {e}");
        std::process::exit(1);
    });

    let schedule = ScheduleService::new(store);
    let mod_log = ModLog::new(Arc::clone(&telegram), config.telegram.mod_log_chat_id);

    let bot = Arc::new(Bot::new(
        Arc::clone(&telegram),
        qa,
        schedule,
        mod_log,
        config.clone(),
    ));

    // Scheduler runtime with its own store handles (non-fatal; the bot
    // runs without deferred execution if this fails)
    let runtime = create_runtime(&config, Arc::clone(&telegram)).await;

    tokio::select! {
        result = bot.run() => {
            if let Err(e) = result {
                eprintln!("fatal: bot error: {e}");
                std::process::exit(1);
            }
        }
        result = async {
            match runtime {
                Some(r) => r.run().await,
                None => {
                    // No scheduler, just wait forever
                    std::future::pending::<Result<()>>().await
                }
            }
        } => {
            if let Err(e) = result {
                eprintln!("fatal: scheduler error: {e}");
                std::process::exit(1);
            }
        }
    }
}

async fn open_store(path: &str) -> Result<JobStore> {
    let db = libsql::Builder::new_local(path)
        .build()
        .await
        .map_err(|e| SentinelError::Database(e.to_string()))?;
    let store = JobStore::new(db);
    store.init().await?;
    Ok(store)
}

/// Build the scheduler runtime with its own DB handles and audit sink.
/// Returns None if initialization fails (non-fatal).
async fn create_runtime(
    config: &Config,
    telegram: Arc<TelegramBot>,
) -> Option<SchedulerRuntime<CommandExecutor<CommunityGateway, ModLog>>> {
    let executor_store = match open_store(&config.database.path).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("sentinel: scheduler store init failed (non-fatal): {e}");
            return None;
        }
    };

    let runtime_store = match open_store(&config.database.path).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("sentinel: scheduler store init failed (non-fatal): {e}");
            return None;
        }
    };

    let gateway = CommunityGateway::new(
        Arc::clone(&telegram),
        config.telegram.community_chat_id,
    );
    let mod_log = ModLog::new(telegram, config.telegram.mod_log_chat_id);
    let executor = CommandExecutor::new(executor_store, gateway, mod_log);

    Some(SchedulerRuntime::new(
        runtime_store,
        executor,
        Duration::from_secs(config.scheduler.poll_interval_secs),
    ))
}
