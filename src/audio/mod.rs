//! Audio one-shots
//!
//! Gameplay code never owns a sound device. Controllers receive an
//! `Rc<dyn AudioService>` and fire named clips at world positions; the host
//! decides what (if anything) actually plays.

use std::cell::Cell;

use glam::Vec3;

/// Sink for fire-and-forget sound effects.
pub trait AudioService {
    /// Play `clip` once, positioned in the world when `position` is given.
    fn play(&self, clip: &str, position: Option<Vec3>);
}

/// Audio service that discards every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioService for SilentAudio {
    fn play(&self, _clip: &str, _position: Option<Vec3>) {}
}

/// Audio service that writes each request to the log.
///
/// Useful for headless runs where there is no output device.
#[derive(Debug, Default)]
pub struct LogAudio {
    muted: Cell<bool>,
    played: Cell<u32>,
}

impl LogAudio {
    /// Create an unmuted logger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mute or unmute
    pub fn set_muted(&self, muted: bool) {
        self.muted.set(muted);
    }

    /// Check if muted
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.muted.get()
    }

    /// Number of clips played while unmuted
    #[must_use]
    pub fn played(&self) -> u32 {
        self.played.get()
    }
}

impl AudioService for LogAudio {
    fn play(&self, clip: &str, position: Option<Vec3>) {
        if self.muted.get() {
            return;
        }
        self.played.set(self.played.get() + 1);
        match position {
            Some(pos) => log::debug!("sound '{clip}' at {pos}"),
            None => log::debug!("sound '{clip}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_audio_counts_unmuted() {
        let audio = LogAudio::new();
        audio.play("swing", None);
        audio.set_muted(true);
        audio.play("hit", Some(Vec3::ONE));
        assert!(audio.is_muted());
        assert_eq!(audio.played(), 1);
    }
}
