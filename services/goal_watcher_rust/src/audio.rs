//! Goal song playback
//!
//! Playback runs as its own tokio task so light commands are never delayed by
//! audio startup. The celebration keeps an [`AudioTask`] handle and joins it
//! before returning to polling.

use crate::scheduler::Clock;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Something that can play the goal song to completion
#[async_trait]
pub trait AudioCue: Send + Sync {
    /// Play the asset; resolves when playback finished
    async fn play(&self) -> Result<()>;

    fn describe(&self) -> String;
}

/// How a spawned playback ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCompletion {
    Finished,
    Failed(String),
    /// Cancelled after exceeding the join timeout
    TimedOut,
    Cancelled,
}

/// Handle to a playback running on its own task
#[derive(Debug)]
pub struct AudioTask {
    handle: JoinHandle<Result<()>>,
}

impl AudioTask {
    /// Start playback without waiting for it
    pub fn spawn(cue: Arc<dyn AudioCue>) -> Self {
        debug!("Starting audio cue: {}", cue.describe());
        let handle = tokio::spawn(async move { cue.play().await });
        Self { handle }
    }

    /// Wait for playback to end, cancelling it if it runs past `timeout` on `clock`
    pub async fn join(mut self, clock: &dyn Clock, timeout: Duration) -> AudioCompletion {
        let joined = tokio::select! {
            biased;
            joined = &mut self.handle => Some(joined),
            _ = clock.sleep(timeout) => None,
        };
        match joined {
            Some(joined) => completion_from(joined),
            None => {
                self.handle.abort();
                AudioCompletion::TimedOut
            }
        }
    }

    pub async fn cancel(self) -> AudioCompletion {
        self.handle.abort();
        match self.handle.await {
            Err(e) if e.is_cancelled() => AudioCompletion::Cancelled,
            other => completion_from(other),
        }
    }
}

fn completion_from(joined: Result<Result<()>, tokio::task::JoinError>) -> AudioCompletion {
    match joined {
        Ok(Ok(())) => AudioCompletion::Finished,
        Ok(Err(e)) => AudioCompletion::Failed(format!("{e:#}")),
        Err(e) if e.is_cancelled() => AudioCompletion::Cancelled,
        Err(e) => AudioCompletion::Failed(format!("audio task panicked: {e}")),
    }
}

// ============================================================================
// Backends
// ============================================================================

/// Plays the asset by running an external player, e.g. `aplay goal.wav`.
///
/// The child is killed if the playback task is cancelled.
#[derive(Debug, Clone)]
pub struct CommandAudioPlayer {
    program: String,
    args: Vec<String>,
    file: PathBuf,
}

impl CommandAudioPlayer {
    /// `command` may carry arguments (`"mpg123 -q"`); the file is appended last
    pub fn new(command: &str, file: impl Into<PathBuf>) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            bail!("audio command is empty");
        };
        Ok(Self {
            program,
            args: parts.collect(),
            file: file.into(),
        })
    }
}

#[async_trait]
impl AudioCue for CommandAudioPlayer {
    async fn play(&self) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.file)
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("failed to start audio player {}", self.program))?;

        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} {}", self.program, self.file.display())
    }
}

/// Plays the asset in-process on the default output device
#[cfg(feature = "rodio")]
#[derive(Debug, Clone)]
pub struct RodioAudioPlayer {
    file: PathBuf,
}

#[cfg(feature = "rodio")]
impl RodioAudioPlayer {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }
}

#[cfg(feature = "rodio")]
#[async_trait]
impl AudioCue for RodioAudioPlayer {
    async fn play(&self) -> Result<()> {
        let file = self.file.clone();
        // OutputStream is not Send; keep the whole playback on one blocking thread
        tokio::task::spawn_blocking(move || -> Result<()> {
            let (_stream, handle) = rodio::OutputStream::try_default()
                .context("failed to open default audio output")?;
            let sink = rodio::Sink::try_new(&handle).context("failed to create audio sink")?;
            let reader = std::io::BufReader::new(
                std::fs::File::open(&file)
                    .with_context(|| format!("failed to open {}", file.display()))?,
            );
            let source = rodio::Decoder::new(reader)
                .with_context(|| format!("failed to decode {}", file.display()))?;
            sink.append(source);
            sink.sleep_until_end();
            Ok(())
        })
        .await
        .context("audio playback thread failed")?
    }

    fn describe(&self) -> String {
        format!("rodio {}", self.file.display())
    }
}

/// No sound; lights only
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAudio;

#[async_trait]
impl AudioCue for SilentAudio {
    async fn play(&self) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "silent".to_string()
    }
}

/// Build the configured backend
pub fn build_audio_cue(config: &crate::config::GoalWatcherConfig) -> Result<Arc<dyn AudioCue>> {
    use crate::config::AudioBackend;

    let cue: Arc<dyn AudioCue> = match config.audio_backend {
        AudioBackend::Command => {
            if !config.audio_file.exists() {
                warn!(
                    "Audio file {} not found; playback will fail",
                    config.audio_file.display()
                );
            }
            Arc::new(CommandAudioPlayer::new(
                &config.audio_command,
                config.audio_file.clone(),
            )?)
        }
        #[cfg(feature = "rodio")]
        AudioBackend::Rodio => Arc::new(RodioAudioPlayer::new(config.audio_file.clone())),
        #[cfg(not(feature = "rodio"))]
        AudioBackend::Rodio => {
            bail!("AUDIO_BACKEND=rodio needs goal_watcher built with the `rodio` feature")
        }
        AudioBackend::None => Arc::new(SilentAudio),
    };

    info!("Audio backend: {} ({})", config.audio_backend.as_str(), cue.describe());
    Ok(cue)
}
