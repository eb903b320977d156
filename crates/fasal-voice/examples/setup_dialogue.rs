//! Setup Dialogue Demo — full dialogue loop over scripted providers.
//!
//! Drives the orchestrator through a complete session with a deterministic
//! recognition script and a silent synthesizer, then prints the emitted
//! profile and the transcript. Swap in `WhisperGatewayRecognizer` /
//! `SpeechGatewaySynthesizer` (set `STT_API_KEY` / `TTS_API_KEY` or
//! `FASAL_API_KEY` in `.env`) to run against real speech services.

use fasal_core::{DialogConfig, GeoPoint, StaticGazetteer};
use fasal_voice::{
    ChannelConsumer, DialogOrchestrator, ScriptedRecognizer, SessionOutcome, SilentSynthesizer,
};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Setup Dialogue Demo — scripted farmer walking through onboarding");

    let recognizer = Arc::new(ScriptedRecognizer::with_replies([
        "telugu",
        "నా పేరు రాము",
        "వద్దు",
        "Warangal",
        "Hanamkonda",
        "2.5",
    ]));
    let synthesizer = Arc::new(SilentSynthesizer::new());
    let (consumer, mut profiles) = ChannelConsumer::new(1);

    let config = DialogConfig::from_env();
    let (orchestrator, _stop) = DialogOrchestrator::new(
        &config,
        recognizer,
        synthesizer.clone(),
        Arc::new(StaticGazetteer::telangana()),
        Arc::new(consumer),
        Some(GeoPoint::new(17.9689, 79.5941)),
    );

    let report = orchestrator.run().await?;
    match report.outcome {
        SessionOutcome::Completed(profile) => {
            info!("session completed: {}", serde_json::to_string_pretty(&profile)?);
        }
        other => info!("session ended without a profile: {:?}", other),
    }

    if let Ok(profile) = profiles.try_recv() {
        info!(
            "analysis consumer received profile for {} ({} ha)",
            profile.user_name, profile.field_area_hectares
        );
    }

    println!("\n--- transcript ---");
    for entry in report.session.transcript().entries() {
        println!("{:?}: {}", entry.speaker, entry.text);
    }
    println!("\n--- prompts spoken ---");
    for (lang, text) in synthesizer.spoken() {
        println!("[{}] {}", lang, text);
    }

    Ok(())
}
