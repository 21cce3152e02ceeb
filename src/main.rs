use std::sync::Arc;

use feed_responder::cli::Prompter;
use feed_responder::composer::ResponseComposer;
use feed_responder::config::EngineConfig;
use feed_responder::dedup::JsonFileStore;
use feed_responder::llm::{GeminiBackend, GenerationClient};
use feed_responder::monitor::FeedMonitorLoop;
use feed_responder::orchestrator::ActionOrchestrator;
use feed_responder::stop::StopSignal;
use feed_responder::surface::{FeedSurface, ReplaySurface};
use feed_responder::timing::TimingModel;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::BufReader;

fn seeded_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("  export GEMINI_API_KEY=key1,key2");
            eprintln!("  export GEMINI_SYSTEM_PROMPT='...'");
            std::process::exit(1);
        }
    };

    eprintln!("Feed Responder v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   API keys: {}", config.api_keys.len());
    eprintln!("   Processed ids: {}", config.processed_file.display());

    let plan = Prompter::new(BufReader::new(tokio::io::stdin()))
        .run_plan(config.community_url.as_deref())
        .await?;

    let replay_file = config.replay_file.clone().ok_or_else(|| {
        anyhow::anyhow!("FEED_REPLAY_FILE must point at a recorded feed snapshot")
    })?;
    let surface: Arc<dyn FeedSurface> = Arc::new(ReplaySurface::from_file(&replay_file).await?);
    eprintln!("   Surface: {} ({})", surface.name(), replay_file.display());
    eprintln!("   Target: {}\n", plan.target.describe());

    let stop = StopSignal::new();
    let client = GenerationClient::new(
        Box::new(GeminiBackend::new(config.model.clone())),
        config.credential_pool()?,
        stop.clone(),
    );
    let composer = ResponseComposer::new(
        client,
        config.templates.clone(),
        plan.keywords.clone(),
        stop.clone(),
    );
    let orchestrator = ActionOrchestrator::new(
        composer,
        TimingModel::new(seeded_rng(config.rng_seed, 0)),
        seeded_rng(config.rng_seed, 1),
        stop.clone(),
    )
    .with_filter_keyword(plan.target.filter_keyword().map(str::to_string));

    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received; finishing current step");
                stop.trigger();
            }
        });
    }

    let summary = FeedMonitorLoop::new(
        orchestrator,
        surface,
        Box::new(JsonFileStore::new(config.processed_file.clone())),
        plan.target,
        stop,
    )
    .with_settings(config.monitor_settings())
    .run()
    .await;

    eprintln!(
        "Stopped after {} cycle(s): {} item(s) processed, {} error(s), ran {}s",
        summary.cycles,
        summary.items_processed,
        summary.errors,
        (summary.finished_at - summary.started_at).num_seconds()
    );
    Ok(())
}
