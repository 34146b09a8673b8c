use anyhow::{Context, Result};
use clap::Parser;
use interview_core::backend::BackendApi;
use interview_core::capture::MicrophoneSource;
use interview_core::initializer::{RandomPicker, build_segment_queue};
use interview_core::renderer::AvatarRenderer;
use interview_core::submitter::RepeatPool;
use interview_core::timer::SessionClock;
use interview_core::{Collaborators, Input, OrchestratorConfig, SessionMode, SessionOrchestrator};
use interview_api::types::SessionCriteria;
use interview_service::backend::HttpBackend;
use interview_service::config::Config;
use interview_service::controls;
use interview_service::microphone::WavFileMicrophone;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Runs a spoken mock interview against the interview backend")]
struct Cli {
    /// The job the interview is for
    job_name: String,

    /// Practice run: stricter answer checks and no token charge
    #[arg(long)]
    training: bool,

    /// Number of questions to ask
    #[arg(long, default_value_t = 5)]
    questions: u32,

    /// Question difficulty passed through to the backend
    #[arg(long)]
    difficulty: Option<String>,

    /// Answer every question with this WAV file instead of the microphone
    #[arg(long)]
    answer_wav: Option<PathBuf>,

    /// Print the available audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 2. Load Configuration and Initialize Logging ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting interview service...");

    // --- 3. Device Listing ---
    if args.list_devices {
        return list_devices();
    }

    // --- 4. Initialize API Client ---
    let backend = Arc::new(HttpBackend::new(&config.api_url, &config.api_key)?);

    // --- 5. Load Session Data ---
    let criteria = SessionCriteria {
        job_name: args.job_name.clone(),
        language: config.language.clone(),
        question_count: args.questions,
        difficulty: args.difficulty.clone(),
        training: args.training,
    };
    let (session, phrases) = tokio::try_join!(
        backend.generate_session(&criteria),
        backend.get_audio_phrases(&config.language, &config.voice_id),
    )
    .context("Failed to load session data")?;
    tracing::info!(
        "Session {} ready with {} questions",
        session.session_id,
        session.questions.len()
    );

    let mut picker = RandomPicker::new();
    let queue = build_segment_queue(session.questions, &phrases, &mut picker)?;
    let retry_phrases = RepeatPool::new(
        phrases.repeat_question_phrases.clone(),
        Box::new(RandomPicker::new()),
    );

    // --- 6. Audio Setup ---
    let renderer = open_renderer()?;
    let microphone = open_microphone(args.answer_wav)?;

    // --- 7. Wire Inputs and Outputs ---
    let (input_tx, input_rx) = tokio::sync::mpsc::channel::<Input>(32);
    let (event_tx, event_rx) = tokio::sync::mpsc::channel(128);

    let mode = if args.training {
        SessionMode::Training
    } else {
        SessionMode::Interview
    };
    let orchestrator_config =
        OrchestratorConfig::new(session.session_id.clone(), args.job_name, mode)
            .with_token_cost(config.token_cost)
            .with_max_retries(config.max_retries_per_question);

    let mut orchestrator = SessionOrchestrator::new(
        orchestrator_config,
        queue,
        Collaborators {
            backend: backend.clone(),
            renderer,
            microphone,
        },
        Box::new(retry_phrases),
        input_rx,
    )
    .with_events(event_tx);

    let seconds = session.duration_seconds.unwrap_or(config.session_seconds);
    let clock = SessionClock::start(seconds);
    let clock_log = controls::spawn_clock_log(clock.subscribe());
    let event_log = controls::spawn_event_log(event_rx);
    let stdin = controls::spawn_stdin_stop(input_tx.clone());
    let ctrl_c = controls::spawn_ctrl_c_abandon(input_tx);

    // --- 8. Run the Session ---
    let result = orchestrator.run().await;

    stdin.abort();
    ctrl_c.abort();
    clock_log.abort();
    drop(orchestrator);
    if let Err(e) = event_log.await {
        tracing::debug!("Event log task ended: {:?}", e);
    }

    match backend.client().stats() {
        Ok(stats) => tracing::info!(
            "Backend requests: {} ({} failed), tokens charged: {}",
            stats.requests(),
            stats.failures(),
            stats.tokens_charged()
        ),
        Err(e) => tracing::warn!("Failed to read client stats: {:?}", e),
    }

    let stats = result.context("Interview session did not complete")?;
    tracing::info!(
        "Interview complete: {} answers accepted, {} questions repeated, {} skipped, {}s left",
        stats.accepted,
        stats.retries,
        stats.capture_skips,
        clock.remaining()
    );
    Ok(())
}

#[cfg(feature = "native-audio")]
fn list_devices() -> Result<()> {
    println!("Input devices:\n{}", interview_service::device::get_available_inputs()?);
    println!("Output devices:\n{}", interview_service::device::get_available_outputs()?);
    Ok(())
}

#[cfg(not(feature = "native-audio"))]
fn list_devices() -> Result<()> {
    println!("Built without the native-audio feature; no audio devices are used.");
    Ok(())
}

#[cfg(feature = "native-audio")]
fn open_renderer() -> Result<Arc<dyn AvatarRenderer>> {
    let renderer = interview_service::renderer::CpalRenderer::open(None)
        .context("Failed to open audio output")?;
    Ok(Arc::new(renderer))
}

#[cfg(not(feature = "native-audio"))]
fn open_renderer() -> Result<Arc<dyn AvatarRenderer>> {
    Ok(Arc::new(interview_service::renderer::HeadlessRenderer::new()))
}

fn open_microphone(answer_wav: Option<PathBuf>) -> Result<Arc<dyn MicrophoneSource>> {
    if let Some(path) = answer_wav {
        tracing::info!("Answering from {}", path.display());
        return Ok(Arc::new(WavFileMicrophone::new(path)));
    }
    default_microphone()
}

#[cfg(feature = "native-audio")]
fn default_microphone() -> Result<Arc<dyn MicrophoneSource>> {
    Ok(Arc::new(interview_service::microphone::CpalMicrophone::new(None)))
}

#[cfg(not(feature = "native-audio"))]
fn default_microphone() -> Result<Arc<dyn MicrophoneSource>> {
    anyhow::bail!("Built without the native-audio feature; pass --answer-wav to answer from a file")
}
