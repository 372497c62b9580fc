//! Script stage.

use async_trait::async_trait;
use tracing::debug;
use vgen_ai_client::{GeminiScriptClient, ServiceResult};
use vgen_models::{ScriptData, SubtitleCue, VisualCue};

use super::{JobContext, ScriptStage};
use crate::adapter::{produce, StageAdapter};
use crate::error::WorkerResult;

/// Seconds covered by each cue of the fallback script.
const FALLBACK_CUE_SECONDS: f64 = 10.0;

const FALLBACK_SHOTS: [&str; 3] = ["cinematic shot of", "close-up of", "wide angle view of"];

/// Deterministic script for `prompt`: three 10 second beats whose
/// subtitles partition the narration over [0, 30).
pub fn fallback_script(prompt: &str) -> ScriptData {
    let subject = prompt.trim();
    let sentences = [
        format!("Welcome to a short journey into {}.", subject),
        format!("Take a closer look at what makes {} remarkable.", subject),
        "Step back and take in the bigger picture.".to_string(),
    ];

    let visual_cues = FALLBACK_SHOTS
        .iter()
        .enumerate()
        .map(|(i, shot)| VisualCue {
            index: i as u32,
            descriptor: format!("{} {}", shot, subject),
            duration_seconds: FALLBACK_CUE_SECONDS,
        })
        .collect();

    let subtitle_cues = sentences
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let start = i as f64 * FALLBACK_CUE_SECONDS;
            SubtitleCue::new(start, start + FALLBACK_CUE_SECONDS, text.clone())
        })
        .collect();

    ScriptData {
        narration: sentences.join(" "),
        visual_cues,
        subtitle_cues,
    }
}

/// Script capability backed by Gemini.
pub struct ScriptAdapter {
    client: GeminiScriptClient,
}

impl ScriptAdapter {
    pub fn new(client: GeminiScriptClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StageAdapter for ScriptAdapter {
    type Input = str;
    type Output = ScriptData;

    fn stage(&self) -> &'static str {
        "script"
    }

    fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    async fn attempt(&self, prompt: &str) -> ServiceResult<ScriptData> {
        self.client.generate_script(prompt).await
    }

    async fn fallback(&self, prompt: &str) -> WorkerResult<ScriptData> {
        Ok(fallback_script(prompt))
    }
}

/// Production script stage. Keeps a copy of the script in the job directory.
pub struct ScriptGenerator {
    adapter: ScriptAdapter,
}

impl ScriptGenerator {
    pub fn new(adapter: ScriptAdapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl ScriptStage for ScriptGenerator {
    async fn generate(&self, ctx: &JobContext, prompt: &str) -> WorkerResult<ScriptData> {
        let script = produce(&self.adapter, prompt).await?;

        ctx.workspace.prepare().await?;
        tokio::fs::write(ctx.workspace.script(), serde_json::to_vec_pretty(&script)?).await?;
        debug!(
            job_id = %ctx.job_id,
            visual_cues = script.visual_cues.len(),
            subtitle_cues = script.subtitle_cues.len(),
            "Script ready"
        );
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgen_ai_client::GeminiConfig;
    use vgen_models::JobId;

    #[test]
    fn test_fallback_script_shape() {
        let script = fallback_script("space exploration");
        assert!(script.validate().is_ok());
        assert!(script.narration.contains("space exploration"));

        assert_eq!(script.visual_cues.len(), 3);
        assert!(script.visual_cues[0].descriptor.starts_with("cinematic"));
        assert!(script.visual_cues[1].descriptor.starts_with("close-up"));
        assert!(script.visual_cues[2].descriptor.starts_with("wide angle"));
        assert!(script
            .visual_cues
            .iter()
            .all(|c| c.duration_seconds == 10.0 && c.descriptor.contains("space exploration")));

        let bounds: Vec<(f64, f64)> = script
            .subtitle_cues
            .iter()
            .map(|c| (c.start_seconds, c.end_seconds))
            .collect();
        assert_eq!(bounds, vec![(0.0, 10.0), (10.0, 20.0), (20.0, 30.0)]);

        let joined: Vec<&str> = script.subtitle_cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined.join(" "), script.narration);
    }

    #[tokio::test]
    async fn test_unconfigured_generator_writes_fallback() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = JobContext::new(dir.path(), &JobId::from_string("script-job"));
        let client = GeminiScriptClient::new(GeminiConfig::default()).unwrap();
        let generator = ScriptGenerator::new(ScriptAdapter::new(client));

        let script = generator.generate(&ctx, "deep sea").await.unwrap();
        assert_eq!(script, fallback_script("deep sea"));

        let saved = tokio::fs::read(ctx.workspace.script()).await.unwrap();
        let saved: ScriptData = serde_json::from_slice(&saved).unwrap();
        assert_eq!(saved, script);
    }
}
