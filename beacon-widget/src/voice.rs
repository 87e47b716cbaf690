//! Voice call state, reduced from the call-transcript event stream.
//!
//! The audio pipeline is someone else's; this module only tracks what the
//! voice screen shows and gates start/stop requests to the transport.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VoiceEvent {
    CallStart,
    CallEnd,
    SpeechStart,
    SpeechEnd,
    Error {
        #[serde(default)]
        message: String,
    },
    Message { message: VoiceMessage },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub transcript_type: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub role: Speaker,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VoiceState {
    pub connected: bool,
    pub connecting: bool,
    pub speaking: bool,
    pub transcript: Vec<TranscriptLine>,
}

impl VoiceState {
    pub fn apply(&mut self, event: VoiceEvent) {
        match event {
            VoiceEvent::CallStart => {
                self.connected = true;
                self.connecting = false;
                self.transcript.clear();
            }
            VoiceEvent::CallEnd => self.reset_flags(),
            VoiceEvent::SpeechStart => self.speaking = true,
            VoiceEvent::SpeechEnd => self.speaking = false,
            VoiceEvent::Error { message } => {
                tracing::error!(%message, "Voice call error");
                self.reset_flags();
            }
            VoiceEvent::Message { message } => {
                // Partial transcripts are superseded by their final form.
                if message.kind != "transcript"
                    || message.transcript_type.as_deref() != Some("final")
                {
                    return;
                }
                let role = match message.role.as_deref() {
                    Some("user") => Speaker::User,
                    _ => Speaker::Assistant,
                };
                self.transcript.push(TranscriptLine {
                    role,
                    text: message.transcript.unwrap_or_default(),
                });
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.connected && !self.connecting
    }

    fn reset_flags(&mut self) {
        self.connected = false;
        self.connecting = false;
        self.speaking = false;
    }
}

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Voice transport error: {0}")]
    Transport(String),
}

/// The external call runtime.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn start(&self) -> Result<(), VoiceError>;
    async fn stop(&self) -> Result<(), VoiceError>;
}

pub struct VoiceCall<T: VoiceTransport> {
    transport: T,
    state: Mutex<VoiceState>,
}

impl<T: VoiceTransport> VoiceCall<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(VoiceState::default()),
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn handle(&self, event: VoiceEvent) {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .apply(event);
    }

    /// Returns `false` when a call is already connecting or connected.
    pub async fn start_call(&self) -> Result<bool, VoiceError> {
        {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            if !state.is_idle() {
                return Ok(false);
            }
            state.connecting = true;
        }

        if let Err(e) = self.transport.start().await {
            tracing::error!(error = %e, "Failed to start voice call");
            self.state
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .connecting = false;
            return Err(e);
        }
        Ok(true)
    }

    /// Returns `false` unless a call is connected. The state itself changes
    /// when the transport reports `call-end`.
    pub async fn end_call(&self) -> Result<bool, VoiceError> {
        if !self.state().connected {
            return Ok(false);
        }
        self.transport.stop().await?;
        Ok(true)
    }
}
