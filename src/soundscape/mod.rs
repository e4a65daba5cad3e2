//! Background soundscape hooks.
//!
//! Audio itself lives outside this crate. The controller only tells a
//! [`Soundscape`] when to play, pause, resume and stop; failures are logged and
//! never change session state.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use thiserror::Error;

use crate::session::SoundscapeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SoundscapeError {
    #[error("soundscape `{0}` is not available")]
    Unavailable(String),
    #[error("soundscape backend disconnected")]
    Disconnected,
}

pub trait Soundscape: Send + Sync {
    fn play(&self, id: &SoundscapeId) -> Result<(), SoundscapeError>;
    fn pause(&self) -> Result<(), SoundscapeError>;
    fn resume(&self) -> Result<(), SoundscapeError>;
    fn stop(&self) -> Result<(), SoundscapeError>;
}

/// Plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSoundscape;

impl Soundscape for SilentSoundscape {
    fn play(&self, _id: &SoundscapeId) -> Result<(), SoundscapeError> {
        Ok(())
    }

    fn pause(&self) -> Result<(), SoundscapeError> {
        Ok(())
    }

    fn resume(&self) -> Result<(), SoundscapeError> {
        Ok(())
    }

    fn stop(&self) -> Result<(), SoundscapeError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundscapeCommand {
    Play(SoundscapeId),
    Pause,
    Resume,
    Stop,
}

/// Sends commands to whatever thread owns the audio output.
pub struct ChannelSoundscape {
    tx: Mutex<Sender<SoundscapeCommand>>,
}

impl ChannelSoundscape {
    pub fn new() -> (Self, Receiver<SoundscapeCommand>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Mutex::new(tx) }, rx)
    }

    fn send(&self, command: SoundscapeCommand) -> Result<(), SoundscapeError> {
        let tx = self.tx.lock().map_err(|_| SoundscapeError::Disconnected)?;
        tx.send(command).map_err(|_| SoundscapeError::Disconnected)
    }
}

impl Soundscape for ChannelSoundscape {
    fn play(&self, id: &SoundscapeId) -> Result<(), SoundscapeError> {
        self.send(SoundscapeCommand::Play(id.clone()))
    }

    fn pause(&self) -> Result<(), SoundscapeError> {
        self.send(SoundscapeCommand::Pause)
    }

    fn resume(&self) -> Result<(), SoundscapeError> {
        self.send(SoundscapeCommand::Resume)
    }

    fn stop(&self) -> Result<(), SoundscapeError> {
        self.send(SoundscapeCommand::Stop)
    }
}
