//! Model warmup before serving.

use tracing::{info, warn};

use habla_core::{SpeechSynthesizer, SynthesisRequest, TtsResult};

/// Sample text used for warmup runs.
const WARMUP_TEXT: &str = "Hola, esta es una prueba de calentamiento del sistema.";

/// Number of warmup synthesis runs per replica.
const WARMUP_RUNS: usize = 2;

/// Run sample syntheses so kernel compilation and allocator growth happen
/// before the first user request instead of during it.
///
/// Individual warmup failures are logged and tolerated; the readiness
/// signal only flips after this returns.
pub fn warm_model(model: &mut dyn SpeechSynthesizer) -> TtsResult<()> {
    info!(model = model.model_name(), "warming model");

    for run in 1..=WARMUP_RUNS {
        let request = SynthesisRequest::new(WARMUP_TEXT);
        match model.synthesize(&request) {
            Ok(audio) => info!(
                run,
                samples = audio.num_samples(),
                "warmup run complete"
            ),
            Err(e) => warn!(run, error = %e, "warmup run failed"),
        }
    }

    Ok(())
}
