use std::sync::Arc;

use tracing::info;

use provjakt_core::{
    config::Config,
    pipeline::PollPipeline,
    ports::{ExamSearchPort, NotifierPort},
    scheduler::PollScheduler,
};
use provjakt_telegram::TelegramNotifier;
use provjakt_trafikverket::TrafikverketClient;

#[tokio::main]
async fn main() -> Result<(), provjakt_core::Error> {
    provjakt_core::logging::init("provjakt")?;

    let cfg = Arc::new(Config::load()?);
    info!(
        "starting with profile {:?}, notify window {}..{}",
        cfg.search_profile, cfg.notify_window.start, cfg.notify_window.end
    );

    let exams: Arc<dyn ExamSearchPort> =
        Arc::new(TrafikverketClient::new(cfg.ssn.clone(), cfg.http_timeout)?);
    let notifier: Arc<dyn NotifierPort> = Arc::new(TelegramNotifier::new(
        &cfg.telegram_bot_token,
        cfg.http_timeout,
    )?);

    let pipeline = Arc::new(PollPipeline::new(Arc::clone(&cfg), exams, notifier));
    let scheduler = PollScheduler::new(pipeline, cfg.poll_interval);

    scheduler.start().await;

    tokio::signal::ctrl_c().await?;
    scheduler.stop().await;

    Ok(())
}
