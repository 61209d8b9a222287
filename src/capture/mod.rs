//! Native stream capture.
//!
//! While a [`StreamCapture`] session is active, the process's stdout and
//! stderr descriptors point at pipe write ends. A drain thread per pipe reads
//! until end-of-stream, so anything written by function code, its dependencies
//! or a stdout-bound tracing subscriber ends up in memory. Deactivating the
//! session restores the original descriptors and flushes the captured bytes
//! into the invocation's [`LogSink`] as native output.
//!
//! Only one session may hold the process streams at a time. A child process
//! that inherited stdout/stderr keeps the pipe open until it exits, which
//! holds up deactivation; background work that outlives the invocation is
//! not captured.

mod fd;

use crate::error::ContextError;
use crate::logging::{LogKind, LogSink};
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, warn};

static CAPTURE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Exclusive claim on the process streams, released on drop.
struct CaptureSlot;

impl CaptureSlot {
    fn claim() -> Result<Self, ContextError> {
        CAPTURE_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| CaptureSlot)
            .map_err(|_| ContextError::CaptureActive)
    }
}

impl Drop for CaptureSlot {
    fn drop(&mut self) {
        CAPTURE_ACTIVE.store(false, Ordering::Release);
    }
}

/// A pipe whose read end is being drained on a background thread.
struct Channel {
    writer: OwnedFd,
    drained: oneshot::Receiver<Vec<u8>>,
}

impl Channel {
    fn open(
        open_pipe: &mut impl FnMut() -> io::Result<(OwnedFd, OwnedFd)>,
        name: &str,
    ) -> io::Result<Self> {
        let (reader, writer) = open_pipe()?;
        let (tx, drained) = oneshot::channel();

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut buffer = Vec::new();
                let mut reader = File::from(reader);
                if let Err(e) = reader.read_to_end(&mut buffer) {
                    warn!("Native stream drain stopped early: {}", e);
                }
                let _ = tx.send(buffer);
            })?;

        Ok(Self { writer, drained })
    }

    /// Point `target` at this channel, keeping a copy of what it pointed at before.
    fn install(self, target: RawFd) -> io::Result<Redirect> {
        let saved = fd::save(target)?;
        fd::redirect(&self.writer, target)?;
        Ok(Redirect {
            target,
            saved,
            channel: self,
        })
    }
}

/// A process stream currently pointing at a capture channel.
struct Redirect {
    target: RawFd,
    saved: OwnedFd,
    channel: Channel,
}

impl Redirect {
    /// Put the original descriptor back and close our write end.
    fn restore(self) -> (io::Result<()>, oneshot::Receiver<Vec<u8>>) {
        let restored = fd::redirect(&self.saved, self.target);
        (restored, self.channel.drained)
    }
}

/// Receivers for the buffers of a released session.
struct Drains {
    logs: oneshot::Receiver<Vec<u8>>,
    errors: oneshot::Receiver<Vec<u8>>,
}

/// Redirection of the process's stdout and stderr for one invocation.
///
/// Dropping a session without calling [`StreamCapture::deactivate`] still
/// restores the original streams, but the captured output is discarded.
pub struct StreamCapture {
    redirects: Option<(Redirect, Redirect)>,
    _slot: CaptureSlot,
}

impl StreamCapture {
    /// Redirect stdout and stderr into pipes.
    ///
    /// Fails with [`ContextError::CaptureActive`] while another session is
    /// active, and with [`ContextError::CaptureUnavailable`] if pipes, drain
    /// threads or descriptor swaps cannot be set up. On failure the process
    /// streams are left exactly as they were.
    pub fn activate() -> Result<Self, ContextError> {
        Self::activate_with(fd::pipe)
    }

    fn activate_with(
        mut open_pipe: impl FnMut() -> io::Result<(OwnedFd, OwnedFd)>,
    ) -> Result<Self, ContextError> {
        let slot = CaptureSlot::claim()?;

        // Drain threads are running before any descriptor is swapped.
        let stdout = Channel::open(&mut open_pipe, "fezz-capture-stdout")
            .map_err(ContextError::CaptureUnavailable)?;
        let stderr = Channel::open(&mut open_pipe, "fezz-capture-stderr")
            .map_err(ContextError::CaptureUnavailable)?;

        fd::flush_std_streams();
        let stdout = stdout
            .install(libc::STDOUT_FILENO)
            .map_err(ContextError::CaptureUnavailable)?;
        let stderr = match stderr.install(libc::STDERR_FILENO) {
            Ok(redirect) => redirect,
            Err(e) => {
                let (restored, _) = stdout.restore();
                if let Err(restore_err) = restored {
                    warn!("Failed to restore stdout after capture error: {}", restore_err);
                }
                return Err(ContextError::CaptureUnavailable(e));
            }
        };

        Ok(Self {
            redirects: Some((stdout, stderr)),
            _slot: slot,
        })
    }

    /// Whether some session currently holds the process streams.
    pub fn is_active() -> bool {
        CAPTURE_ACTIVE.load(Ordering::Acquire)
    }

    /// Restore the original streams and write captured output into `sink`.
    ///
    /// Captured stdout becomes native log output and captured stderr native
    /// error output. Waits for both drain threads to reach end-of-stream.
    pub async fn deactivate(mut self, sink: &mut LogSink) {
        let Some(drains) = self.release() else {
            return;
        };

        let logs = collect(drains.logs, "stdout").await;
        let errors = collect(drains.errors, "stderr").await;
        debug!(
            "Captured {} stdout and {} stderr bytes",
            logs.len(),
            errors.len()
        );

        if !logs.is_empty() {
            sink.write(String::from_utf8_lossy(&logs).into_owned(), LogKind::Log, true);
        }
        if !errors.is_empty() {
            sink.write(String::from_utf8_lossy(&errors).into_owned(), LogKind::Error, true);
        }
    }

    fn release(&mut self) -> Option<Drains> {
        let (stdout, stderr) = self.redirects.take()?;

        fd::flush_std_streams();
        let (stdout_restored, logs) = stdout.restore();
        let (stderr_restored, errors) = stderr.restore();

        // Streams are back; safe to report through tracing again.
        for (stream, restored) in [("stdout", stdout_restored), ("stderr", stderr_restored)] {
            if let Err(e) = restored {
                warn!("Failed to restore {} after capture: {}", stream, e);
            }
        }

        Some(Drains { logs, errors })
    }
}

impl Drop for StreamCapture {
    fn drop(&mut self) {
        if self.release().is_some() {
            warn!("Stream capture dropped without deactivation; captured output discarded");
        }
    }
}

impl std::fmt::Debug for StreamCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCapture")
            .field("active", &self.redirects.is_some())
            .finish()
    }
}

async fn collect(drained: oneshot::Receiver<Vec<u8>>, stream: &str) -> Vec<u8> {
    match drained.await {
        Ok(buffer) => buffer,
        Err(_) => {
            warn!("Drain thread for {} exited without a buffer", stream);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::MaybeUninit;
    use std::sync::Mutex;

    // Tests below contend for the process-wide slot.
    static SERIAL: Mutex<()> = Mutex::new(());

    // Identity of the open file behind a descriptor.
    fn identity(target: RawFd) -> (u64, u64) {
        let mut stat = MaybeUninit::<libc::stat>::uninit();
        let rc = unsafe { libc::fstat(target, stat.as_mut_ptr()) };
        assert_eq!(rc, 0);
        let stat = unsafe { stat.assume_init() };
        (stat.st_dev as u64, stat.st_ino as u64)
    }

    fn stream_identities() -> ((u64, u64), (u64, u64)) {
        (identity(libc::STDOUT_FILENO), identity(libc::STDERR_FILENO))
    }

    #[test]
    fn test_failed_pipe_leaves_streams_untouched() {
        let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let before = stream_identities();

        let mut calls = 0;
        let result = StreamCapture::activate_with(|| {
            calls += 1;
            if calls == 2 {
                Err(io::Error::other("no more pipes"))
            } else {
                fd::pipe()
            }
        });

        assert!(matches!(result, Err(ContextError::CaptureUnavailable(_))));
        assert_eq!(calls, 2);
        assert_eq!(stream_identities(), before);
        assert!(!StreamCapture::is_active());
    }

    #[test]
    fn test_claimed_slot_rejects_activation() {
        let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let before = stream_identities();

        let slot = CaptureSlot::claim().unwrap();
        let result = StreamCapture::activate();
        assert!(matches!(result, Err(ContextError::CaptureActive)));
        assert_eq!(stream_identities(), before);

        drop(slot);
        assert!(!StreamCapture::is_active());
    }

    #[test]
    fn test_pipe_round_trip() {
        use std::io::Write;

        let (reader, writer) = fd::pipe().unwrap();
        let mut writer = File::from(writer);
        writer.write_all(b"through the pipe").unwrap();
        drop(writer);

        let mut contents = String::new();
        File::from(reader).read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "through the pipe");
    }
}
