//! Audio Preview Playback
//!
//! Playback is the only background work in the engine. A worker thread runs
//! [`MediaBackend::play`] while the command thread keeps going; the two
//! sides coordinate through a pair of flags:
//! - `now_playing`: set by the controller, cleared to request a stop
//! - `audio_ready`: set by the backend once output has actually started

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::{
    media::{MediaBackend, MediaHandle},
    CoreError, CoreResult, TimeSec,
};

// =============================================================================
// Signals
// =============================================================================

/// Flags shared between the controller and one playback worker
#[derive(Clone, Debug)]
pub struct PlaybackSignals {
    now_playing: Arc<AtomicBool>,
    audio_ready: Arc<(Mutex<bool>, Condvar)>,
    /// Sample rate requested for preview output
    pub audio_fps: u32,
    /// Output buffer size in samples
    pub buffer_size: usize,
}

impl PlaybackSignals {
    pub fn new(audio_fps: u32, buffer_size: usize) -> Self {
        Self {
            now_playing: Arc::new(AtomicBool::new(false)),
            audio_ready: Arc::new((Mutex::new(false), Condvar::new())),
            audio_fps,
            buffer_size,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.now_playing.load(Ordering::SeqCst)
    }

    fn set_playing(&self) {
        self.now_playing.store(true, Ordering::SeqCst);
    }

    /// Asks the worker to stop
    pub fn stop(&self) {
        self.now_playing.store(false, Ordering::SeqCst);
    }

    /// Called by the backend once audio output is running
    pub fn mark_audio_ready(&self) {
        let (lock, cvar) = &*self.audio_ready;
        if let Ok(mut ready) = lock.lock() {
            *ready = true;
            cvar.notify_all();
        }
    }

    pub fn is_audio_ready(&self) -> bool {
        self.audio_ready.0.lock().map(|r| *r).unwrap_or(false)
    }

    /// Blocks until audio is ready, the worker gave up, or `timeout` passes.
    /// Returns whether audio became ready.
    pub fn wait_audio_ready(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.audio_ready;
        let Ok(mut guard) = lock.lock() else {
            return false;
        };
        let deadline = Instant::now() + timeout;
        while !*guard && self.is_playing() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            // Re-check periodically so a worker that dies before signalling
            // does not hold us for the whole timeout.
            let wait = (deadline - now).min(Duration::from_millis(20));
            match cvar.wait_timeout(guard, wait) {
                Ok((g, _)) => guard = g,
                Err(_) => return false,
            }
        }
        *guard
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Owns the current playback worker
pub struct PlaybackController {
    signals: Option<PlaybackSignals>,
    worker: Option<JoinHandle<()>>,
    started_at: Option<Instant>,
    start_pos: TimeSec,
    audio_fps: u32,
    buffer_size: usize,
    ready_timeout: Duration,
}

impl PlaybackController {
    pub fn new(audio_fps: u32, buffer_size: usize, ready_timeout: Duration) -> Self {
        Self {
            signals: None,
            worker: None,
            started_at: None,
            start_pos: 0.0,
            audio_fps,
            buffer_size,
            ready_timeout,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.signals.as_ref().is_some_and(|s| s.is_playing())
    }

    /// Starts playing `clip`, which begins at `start_pos` of the clip the
    /// user is looking at. Returns once the backend reports audio output.
    pub fn start(
        &mut self,
        backend: Arc<dyn MediaBackend>,
        clip: MediaHandle,
        start_pos: TimeSec,
    ) -> CoreResult<()> {
        self.stop();

        let signals = PlaybackSignals::new(self.audio_fps, self.buffer_size);
        signals.set_playing();
        let worker_signals = signals.clone();

        let worker = std::thread::Builder::new()
            .name("tanto-playback".to_string())
            .spawn(move || {
                if let Err(e) = backend.play(&clip, &worker_signals) {
                    warn!(error = %e, "Playback failed");
                }
                worker_signals.stop();
                debug!("Playback worker finished");
            })?;

        if !signals.wait_audio_ready(self.ready_timeout) {
            signals.stop();
            let _ = worker.join();
            return Err(CoreError::Internal(
                "playback did not start in time".to_string(),
            ));
        }

        self.started_at = Some(Instant::now());
        self.start_pos = start_pos;
        self.signals = Some(signals);
        self.worker = Some(worker);
        Ok(())
    }

    /// Stops playback and waits for the worker to exit.
    ///
    /// Returns the position reached if something was playing. The stop flag
    /// is cleared before the position is derived from elapsed time.
    pub fn stop(&mut self) -> Option<TimeSec> {
        let signals = self.signals.take()?;
        let was_playing = signals.is_playing();
        signals.stop();
        let position = self
            .started_at
            .take()
            .map(|t| self.start_pos + t.elapsed().as_secs_f64());

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Playback worker panicked");
            }
        }
        if was_playing {
            position
        } else {
            None
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop();
    }
}
