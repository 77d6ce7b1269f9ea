use anyhow::Result;
use poll_quiz_bot::bot::{self, BotServices, TelegramPlatform};
use poll_quiz_bot::config::AppConfig;
use poll_quiz_bot::dialogue::{QuizDialogue, QuizDialogueState};
use poll_quiz_bot::errors::error_logging;
use poll_quiz_bot::localization;
use poll_quiz_bot::observability::{self, health_checks, ReadinessContext};
use poll_quiz_bot::question_bank::{FsQuestionBank, QuestionBank};
use poll_quiz_bot::quiz::{spawn_idle_sweeper, QuizEngine, QuizPlatform, QuizSessionStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::PollAnswer;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// How often health checks and session gauges are refreshed
const HEALTH_RECORD_INTERVAL: Duration = Duration::from_secs(60);

/// Chat whose dialogue a callback belongs to: the chat of the keyboard message
fn callback_chat_id(q: &CallbackQuery) -> ChatId {
    q.message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or_else(|| ChatId::from(q.from.id))
}

#[tokio::main]
async fn main() -> Result<()> {
    let startup = Instant::now();

    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    observability::init_tracing_stack(&config.observability).await?;

    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "app_config", "startup_validation");
        return Err(e.into());
    }
    info!("{}", config.summary());

    let bank = Arc::new(FsQuestionBank::new(&config.quiz.quiz_root));
    bank.init()?;

    let store = Arc::new(QuizSessionStore::new(config.quiz.max_questions));
    let shutdown = CancellationToken::new();

    let readiness = ReadinessContext {
        bot_token: config.bot.token.clone(),
        quiz_root: config.quiz.quiz_root.clone(),
        store: Arc::clone(&store),
    };
    observability::init_metrics_server(&config.observability, readiness.clone()).await?;

    let health_handle = health_checks::start_health_metrics_recorder(
        readiness,
        HEALTH_RECORD_INTERVAL,
        shutdown.clone(),
    );
    let sweeper_handle = spawn_idle_sweeper(
        Arc::clone(&store),
        config.quiz.idle_timeout(),
        config.quiz.sweep_interval(),
        shutdown.clone(),
    );

    // Initialize localization manager
    let localization_manager = localization::create_localization_manager()?;

    // Initialize the bot with custom client configuration for better reliability
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.bot.http_timeout_secs))
        .build()?;
    let bot = Bot::with_client(config.bot.token.clone(), client.clone());

    let platform: Arc<dyn QuizPlatform> = Arc::new(TelegramPlatform::new(bot.clone()));
    let question_bank: Arc<dyn QuestionBank> = bank.clone();
    let engine = QuizEngine::new(
        Arc::clone(&store),
        question_bank,
        platform,
        Arc::clone(&localization_manager),
        &config.quiz,
    );

    let services = BotServices {
        engine,
        bank,
        localization: localization_manager,
        admin_ids: Arc::new(config.bot.admin_ids.clone()),
        http: client,
    };

    info!(
        timeout_secs = config.bot.http_timeout_secs,
        admins = services.admin_ids.len(),
        "Bot initialized, starting dispatcher"
    );

    // Create shared dialogue storage
    let dialogue_storage = InMemStorage::<QuizDialogueState>::new();

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let services = services.clone();
            let storage = dialogue_storage.clone();
            move |bot: Bot, msg: Message| {
                let services = services.clone();
                let dialogue = QuizDialogue::new(storage.clone(), msg.chat.id);
                async move { bot::message_handler(bot, msg, services, dialogue).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let services = services.clone();
            let storage = dialogue_storage.clone();
            move |bot: Bot, q: CallbackQuery| {
                let services = services.clone();
                let dialogue = QuizDialogue::new(storage.clone(), callback_chat_id(&q));
                async move { bot::callback_handler(bot, q, services, dialogue).await }
            }
        }))
        .branch(Update::filter_poll_answer().endpoint({
            let services = services.clone();
            move |answer: PollAnswer| {
                let services = services.clone();
                async move { bot::poll_answer_handler(answer, services).await }
            }
        }));

    observability::metrics::record_startup_metrics(startup.elapsed());

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, shutting down background tasks");
    shutdown.cancel();
    let _ = tokio::join!(sweeper_handle, health_handle);

    Ok(())
}
