use crate::api::elevenlabs::ElevenLabsSynthesizer;
use crate::api::gemini::GeminiClient;
use crate::api::piper::PiperSynthesizer;
use crate::api::upload::CookieUploader;
use crate::api::{ScriptSource, SpeechSynthesizer, Uploader};
use crate::archive::{self, GalleryEntry};
use crate::assembler::{ClipAssembler, FfmpegAssembler};
use crate::config::{CleanupPolicy, Config, TtsBackend};
use crate::error::{FailurePolicy, Stage, StageError};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;

const ARCHIVE_TITLE_CHARS: usize = 80;

#[derive(Debug, Clone)]
pub struct RunReport {
    pub script: String,
    pub video: PathBuf,
    pub archived: bool,
    pub uploaded: bool,
    /// Non-fatal stage failures, in the order they happened.
    pub warnings: Vec<String>,
}

/// One end-to-end run: script, voiceover, render, archive, upload.
pub struct Pipeline {
    cfg: Config,
    script_source: Box<dyn ScriptSource>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    assembler: Box<dyn ClipAssembler>,
    uploader: Option<Box<dyn Uploader>>,
}

impl Pipeline {
    pub fn new(
        cfg: Config,
        script_source: Box<dyn ScriptSource>,
        synthesizer: Box<dyn SpeechSynthesizer>,
        assembler: Box<dyn ClipAssembler>,
        uploader: Option<Box<dyn Uploader>>,
    ) -> Self {
        Self {
            cfg,
            script_source,
            synthesizer,
            assembler,
            uploader,
        }
    }

    pub fn from_config(cfg: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        let script_source = Box::new(GeminiClient::new(client.clone(), &cfg));
        let synthesizer: Box<dyn SpeechSynthesizer> = match cfg.tts.backend {
            TtsBackend::Piper => Box::new(PiperSynthesizer::new(&cfg.tts.piper_model)),
            TtsBackend::ElevenLabs => Box::new(ElevenLabsSynthesizer::new(client, &cfg.tts)),
        };
        let assembler = Box::new(FfmpegAssembler::new(&cfg));
        let uploader: Option<Box<dyn Uploader>> = if cfg.upload.enabled {
            Some(Box::new(CookieUploader::new(&cfg.upload)?))
        } else {
            None
        };

        Ok(Self::new(cfg, script_source, synthesizer, assembler, uploader))
    }

    fn fail(stage: Stage, err: anyhow::Error, warnings: &mut Vec<String>) -> Result<(), StageError> {
        let err = StageError::new(stage, err);
        match stage.policy() {
            FailurePolicy::Fatal => Err(err),
            FailurePolicy::LogAndContinue => {
                logw(format!("{} (continuing)", err));
                warnings.push(err.to_string());
                Ok(())
            }
        }
    }

    pub async fn run(&self) -> Result<RunReport, StageError> {
        let mut warnings = Vec::new();

        logi("Step 1: Generating script...");
        let script = self
            .script_source
            .generate_script(&self.cfg.prompt)
            .await
            .and_then(|text| {
                let text = text.trim().to_string();
                if text.is_empty() {
                    anyhow::bail!("empty script");
                }
                Ok(text)
            })
            .map_err(|e| StageError::new(Stage::ScriptGen, e))?;
        logok(format!("Script ready ({} chars)", script.len()));

        logi("Step 2: Generating voiceover...");
        let audio = self.cfg.audio_path();
        self.synthesizer
            .synthesize(&script, &audio)
            .await
            .map_err(|e| StageError::new(Stage::Synthesis, e))?;
        logok(format!("Voiceover written: {}", audio.display()));

        logi("Step 3: Assembling video...");
        let created = chrono::Local::now();
        let out_mp4 = self.cfg.output_file_name(created);
        let assembled = self
            .assembler
            .assemble(&audio, &script, &out_mp4)
            .await
            .map_err(|e| StageError::new(Stage::Render, e))?;
        logok(format!(
            "Rendered {} from {}",
            assembled.path.display(),
            assembled.background.display()
        ));

        if self.cfg.cleanup == CleanupPolicy::RemoveAudio {
            if let Err(err) = fs::remove_file(&audio).await {
                logw(format!("Could not remove {}: {}", audio.display(), err));
            }
        }

        logi("Step 4: Updating archive...");
        let entry = GalleryEntry::from_script(
            assembled.path.clone(),
            &script,
            created,
            ARCHIVE_TITLE_CHARS,
        );
        let archived = match archive::append_entry(&self.cfg.archive_path, &entry).await {
            Ok(()) => {
                logok(format!("Archive updated: {}", self.cfg.archive_path.display()));
                true
            }
            Err(err) => {
                Self::fail(Stage::Archive, err, &mut warnings)?;
                false
            }
        };

        let uploaded = match &self.uploader {
            None => {
                logi("Step 5: Upload disabled; skipping.");
                false
            }
            Some(uploader) => {
                logi(format!("Step 5: Posting to {}...", self.cfg.upload.target.label()));
                match uploader
                    .upload(&assembled.path, &self.cfg.upload.description)
                    .await
                {
                    Ok(()) => {
                        logok("Upload complete.");
                        true
                    }
                    Err(err) => {
                        Self::fail(Stage::Upload, err, &mut warnings)?;
                        false
                    }
                }
            }
        };

        Ok(RunReport {
            script,
            video: assembled.path,
            archived,
            uploaded,
            warnings,
        })
    }
}

pub async fn run_generation(cfg: Config) -> Result<RunReport> {
    let pipeline = Pipeline::from_config(cfg)?;
    let report = pipeline.run().await?;
    logi(format!(
        "All done. video={} archived={} uploaded={}",
        report.video.display(),
        report.archived,
        report.uploaded
    ));
    Ok(report)
}
