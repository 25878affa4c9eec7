//! Voice Capture
//!
//! Records a clip from the microphone and turns it into text through the
//! transcription service. The transcript goes into the input buffer; it is
//! never sent automatically.
//!
//! ```text
//! Idle ──start──▶ Recording ──stop──▶ Transcribing ──done/fail──▶ Idle
//! ```
//!
//! Toggling while a clip is being transcribed is ignored.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use crate::backend::{AudioClip, BackendError, Transcriber};
use crate::messages::CaptureState;
use crate::speech::Speaker;

/// Alert shown for any processing failure
const PROCESSING_FAILED: &str = "No se pudo procesar el audio, intentelo más tarde";

/// Voice capture failures
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The user refused microphone access
    #[error("microphone permission denied")]
    PermissionDenied,

    /// Recording produced nothing
    #[error("no audio was recorded")]
    NoAudio,

    /// A clip is already being transcribed
    #[error("a clip is still being transcribed")]
    Busy,

    /// Stop without a recording in progress
    #[error("not recording")]
    NotRecording,

    /// The recorder itself failed
    #[error("recorder error: {0}")]
    Recorder(String),

    /// The transcription service failed
    #[error("transcription failed: {0}")]
    Transcription(#[from] BackendError),
}

impl CaptureError {
    /// Blocking alert `(title, message)` for this failure, if any
    #[must_use]
    pub fn alert(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::PermissionDenied => Some(("Permisos requeridos", "Acceso al micrófono denegado.")),
            Self::NoAudio => Some(("Error", "No se detectó audio grabado")),
            Self::Recorder(_) | Self::Transcription(_) => Some(("Error", PROCESSING_FAILED)),
            Self::Busy | Self::NotRecording => None,
        }
    }
}

/// Platform recorder
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Whether access was already granted
    async fn permission_granted(&self) -> bool;

    /// Prompt for access; returns whether it was granted
    async fn request_permission(&self) -> bool;

    /// Start recording
    async fn start(&self) -> Result<(), CaptureError>;

    /// Stop recording and hand back the clip, if anything was captured
    async fn stop(&self) -> Result<Option<AudioClip>, CaptureError>;
}

/// Microphone button logic
pub struct VoiceCapture {
    microphone: Arc<dyn Microphone>,
    transcriber: Arc<dyn Transcriber>,
    speaker: Speaker,
    state: Mutex<CaptureState>,
}

impl std::fmt::Debug for VoiceCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceCapture")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl VoiceCapture {
    /// Create the adapter; `speaker` is silenced before every recording
    pub fn new(
        microphone: Arc<dyn Microphone>,
        transcriber: Arc<dyn Transcriber>,
        speaker: Speaker,
    ) -> Self {
        Self {
            microphone,
            transcriber,
            speaker,
            state: Mutex::new(CaptureState::Idle),
        }
    }

    /// Current state
    pub fn state(&self) -> CaptureState {
        *self.state.lock()
    }

    /// Transcription service, for callers that upload on their own task
    pub fn transcriber(&self) -> Arc<dyn Transcriber> {
        Arc::clone(&self.transcriber)
    }

    /// Start recording.
    ///
    /// Asks for permission when needed and silences the avatar first.
    pub async fn start_capture(&self) -> Result<(), CaptureError> {
        match self.state() {
            CaptureState::Idle => {}
            CaptureState::Recording => return Ok(()),
            CaptureState::Transcribing => return Err(CaptureError::Busy),
        }

        if !self.microphone.permission_granted().await && !self.microphone.request_permission().await {
            tracing::info!("Microphone permission denied");
            return Err(CaptureError::PermissionDenied);
        }

        self.speaker.silence();
        self.microphone.start().await?;
        *self.state.lock() = CaptureState::Recording;
        tracing::debug!("Recording started");
        Ok(())
    }

    /// Stop recording and return the clip to upload.
    ///
    /// On success the adapter is left in `Transcribing` until
    /// [`finish_transcription`](Self::finish_transcription) is called.
    pub async fn stop_recording(&self) -> Result<AudioClip, CaptureError> {
        match self.state() {
            CaptureState::Recording => {}
            CaptureState::Idle => return Err(CaptureError::NotRecording),
            CaptureState::Transcribing => return Err(CaptureError::Busy),
        }

        let stopped = self.microphone.stop().await;
        let clip = match stopped {
            Ok(Some(clip)) if !clip.is_empty() => clip,
            Ok(_) => {
                *self.state.lock() = CaptureState::Idle;
                return Err(CaptureError::NoAudio);
            }
            Err(e) => {
                *self.state.lock() = CaptureState::Idle;
                return Err(e);
            }
        };

        *self.state.lock() = CaptureState::Transcribing;
        Ok(clip)
    }

    /// Fold the transcription outcome back in, returning to `Idle`
    pub fn finish_transcription(
        &self,
        outcome: Result<String, BackendError>,
    ) -> Result<String, CaptureError> {
        *self.state.lock() = CaptureState::Idle;
        match outcome {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Transcription failed");
                Err(CaptureError::Transcription(e))
            }
        }
    }

    /// Stop recording and transcribe in one call
    pub async fn stop_capture(&self) -> Result<String, CaptureError> {
        let clip = self.stop_recording().await?;
        let outcome = self.transcriber.transcribe(clip).await;
        self.finish_transcription(outcome)
    }
}

/// Recorder that "records" a clip file chosen beforehand
///
/// Used by the terminal surface, where there is no microphone to open.
#[derive(Debug, Default)]
pub struct FileMicrophone {
    selected: Mutex<Option<PathBuf>>,
    recording: Mutex<bool>,
}

impl FileMicrophone {
    /// Create a recorder with nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the clip the next recording will produce
    pub fn select_clip(&self, path: impl Into<PathBuf>) {
        *self.selected.lock() = Some(path.into());
    }
}

#[async_trait]
impl Microphone for FileMicrophone {
    async fn permission_granted(&self) -> bool {
        true
    }

    async fn request_permission(&self) -> bool {
        true
    }

    async fn start(&self) -> Result<(), CaptureError> {
        *self.recording.lock() = true;
        Ok(())
    }

    async fn stop(&self) -> Result<Option<AudioClip>, CaptureError> {
        if !std::mem::replace(&mut *self.recording.lock(), false) {
            return Err(CaptureError::NotRecording);
        }
        let Some(path) = self.selected.lock().take() else {
            return Ok(None);
        };
        AudioClip::from_path(&path)
            .await
            .map(Some)
            .map_err(|e| CaptureError::Recorder(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::{TimedUtterancePlayer, UtteranceEvent};
    use crate::messages::MessageId;
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;

    struct ScriptedMic {
        granted: AtomicBool,
        grant_on_request: bool,
        clip: Mutex<Option<AudioClip>>,
    }

    impl ScriptedMic {
        fn new(granted: bool, grant_on_request: bool, clip: Option<AudioClip>) -> Self {
            Self {
                granted: AtomicBool::new(granted),
                grant_on_request,
                clip: Mutex::new(clip),
            }
        }
    }

    #[async_trait]
    impl Microphone for ScriptedMic {
        async fn permission_granted(&self) -> bool {
            self.granted.load(Ordering::SeqCst)
        }

        async fn request_permission(&self) -> bool {
            self.granted.store(self.grant_on_request, Ordering::SeqCst);
            self.grant_on_request
        }

        async fn start(&self) -> Result<(), CaptureError> {
            Ok(())
        }

        async fn stop(&self) -> Result<Option<AudioClip>, CaptureError> {
            Ok(self.clip.lock().take())
        }
    }

    struct ScriptedTranscriber(Result<&'static str, ()>);

    #[async_trait]
    impl Transcriber for ScriptedTranscriber {
        async fn transcribe(&self, _clip: AudioClip) -> Result<String, BackendError> {
            self.0
                .map(str::to_string)
                .map_err(|()| BackendError::Status {
                    status: 500,
                    body: "boom".to_string(),
                })
        }
    }

    fn capture(
        mic: ScriptedMic,
        transcript: Result<&'static str, ()>,
    ) -> (VoiceCapture, mpsc::UnboundedReceiver<UtteranceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let speaker = Speaker::new(Arc::new(TimedUtterancePlayer::default()), tx);
        let voice = VoiceCapture::new(
            Arc::new(mic),
            Arc::new(ScriptedTranscriber(transcript)),
            speaker,
        );
        (voice, rx)
    }

    fn clip() -> Option<AudioClip> {
        Some(AudioClip::new(vec![0xFF, 0xFB], "mp3"))
    }

    #[tokio::test]
    async fn test_capture_and_transcribe() {
        let (voice, _rx) = capture(ScriptedMic::new(true, true, clip()), Ok(" me siento triste "));

        voice.start_capture().await.unwrap();
        assert_eq!(voice.state(), CaptureState::Recording);

        let text = voice.stop_capture().await.unwrap();
        assert_eq!(text, "me siento triste");
        assert_eq!(voice.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let (voice, _rx) = capture(ScriptedMic::new(false, false, clip()), Ok("x"));

        let err = voice.start_capture().await.unwrap_err();
        assert!(matches!(err, CaptureError::PermissionDenied));
        assert_eq!(err.alert(), Some(("Permisos requeridos", "Acceso al micrófono denegado.")));
        assert_eq!(voice.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_permission_prompted_once_granted() {
        let (voice, _rx) = capture(ScriptedMic::new(false, true, clip()), Ok("x"));
        voice.start_capture().await.unwrap();
        assert_eq!(voice.state(), CaptureState::Recording);
    }

    #[tokio::test]
    async fn test_no_audio() {
        let (voice, _rx) = capture(ScriptedMic::new(true, true, None), Ok("x"));
        voice.start_capture().await.unwrap();

        let err = voice.stop_capture().await.unwrap_err();
        assert_eq!(err.alert(), Some(("Error", "No se detectó audio grabado")));
        assert_eq!(voice.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_transcription_failure_alert() {
        let (voice, _rx) = capture(ScriptedMic::new(true, true, clip()), Err(()));
        voice.start_capture().await.unwrap();

        let err = voice.stop_capture().await.unwrap_err();
        assert!(matches!(err, CaptureError::Transcription(_)));
        assert_eq!(err.alert(), Some(("Error", PROCESSING_FAILED)));
        assert_eq!(voice.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_toggle_while_transcribing_is_busy() {
        let (voice, _rx) = capture(ScriptedMic::new(true, true, clip()), Ok("x"));
        voice.start_capture().await.unwrap();
        let _clip = voice.stop_recording().await.unwrap();
        assert_eq!(voice.state(), CaptureState::Transcribing);

        assert!(matches!(voice.start_capture().await, Err(CaptureError::Busy)));
        assert!(matches!(voice.stop_recording().await, Err(CaptureError::Busy)));
        assert_eq!(CaptureError::Busy.alert(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_silences_speech() {
        let (voice, mut rx) = capture(ScriptedMic::new(true, true, clip()), Ok("x"));
        let id = MessageId::new();
        voice.speaker.say(&id, "hola, ¿cómo estás?");

        voice.start_capture().await.unwrap();

        assert_eq!(rx.try_recv().unwrap(), UtteranceEvent::Started(id.clone()));
        assert_eq!(rx.try_recv().unwrap(), UtteranceEvent::Stopped(id));
    }

    #[tokio::test]
    async fn test_file_microphone() {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(b"RIFF").unwrap();

        let mic = FileMicrophone::new();
        assert!(matches!(mic.stop().await, Err(CaptureError::NotRecording)));

        mic.start().await.unwrap();
        assert_eq!(mic.stop().await.unwrap(), None);

        mic.select_clip(file.path());
        mic.start().await.unwrap();
        let clip = mic.stop().await.unwrap().unwrap();
        assert_eq!(clip.file_name, "audio.wav");
        assert_eq!(clip.bytes, b"RIFF");
    }
}
