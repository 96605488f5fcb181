//! Scoped silencing of stdout/stderr while audio hosts initialize.
//!
//! ALSA and JACK write diagnostics straight to the process file descriptors
//! during host enumeration, so the redirection happens at the fd level rather
//! than through Rust's `std::io` handles. Guards nest and may be taken from
//! several threads: the first guard on a descriptor saves it, the last one
//! dropped puts it back.

use std::io;

/// Which standard streams a [`QuietGuard`] silences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Streams {
    Stdout,
    Stderr,
    Both,
}

impl Streams {
    fn covers(self, index: usize) -> bool {
        match self {
            Streams::Stdout => index == 0,
            Streams::Stderr => index == 1,
            Streams::Both => true,
        }
    }
}

/// Keeps the selected streams pointed at `/dev/null` until dropped.
#[must_use = "output is restored as soon as the guard is dropped"]
pub struct QuietGuard {
    held: [bool; 2],
}

/// Redirect the selected streams to a null sink for the guard's lifetime.
pub fn suppress_output(streams: Streams) -> io::Result<QuietGuard> {
    imp::acquire(streams)
}

/// Run `f` with the selected streams silenced.
///
/// If the streams cannot be redirected, `f` still runs with output visible.
pub fn quietly<T>(streams: Streams, f: impl FnOnce() -> T) -> T {
    let _guard = match suppress_output(streams) {
        Ok(guard) => Some(guard),
        Err(e) => {
            tracing::warn!("Could not silence backend output: {}", e);
            None
        }
    };
    f()
}

impl Drop for QuietGuard {
    fn drop(&mut self) {
        imp::release(&self.held);
    }
}

#[cfg(unix)]
mod imp {
    use super::{QuietGuard, Streams};
    use std::fs::OpenOptions;
    use std::io::{self, Write};
    use std::os::unix::io::{AsRawFd, RawFd};
    use std::sync::{Mutex, MutexGuard};
    use tracing::debug;

    pub(super) struct Slot {
        pub(super) fd: RawFd,
        pub(super) depth: usize,
        pub(super) saved: RawFd,
    }

    impl Slot {
        pub(super) const fn new(fd: RawFd) -> Self {
            Self {
                fd,
                depth: 0,
                saved: -1,
            }
        }
    }

    static SLOTS: Mutex<[Slot; 2]> = Mutex::new([
        Slot::new(libc::STDOUT_FILENO),
        Slot::new(libc::STDERR_FILENO),
    ]);

    fn lock() -> MutexGuard<'static, [Slot; 2]> {
        SLOTS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn flush_std() {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
    }

    pub(super) fn acquire(streams: Streams) -> io::Result<QuietGuard> {
        let mut slots = lock();
        let mut held = [false; 2];

        let needs_sink = slots
            .iter()
            .enumerate()
            .any(|(i, slot)| streams.covers(i) && slot.depth == 0);
        let sink = if needs_sink {
            Some(OpenOptions::new().write(true).open("/dev/null")?)
        } else {
            None
        };

        let sink_fd = sink.as_ref().map(|f| f.as_raw_fd());

        for i in 0..slots.len() {
            if !streams.covers(i) {
                continue;
            }

            if slots[i].depth == 0 {
                if let Err(e) = redirect(&mut slots[i], sink_fd) {
                    restore(&mut slots[..], &held);
                    return Err(e);
                }
            }
            slots[i].depth += 1;
            held[i] = true;
        }

        Ok(QuietGuard { held })
    }

    fn redirect(slot: &mut Slot, sink: Option<RawFd>) -> io::Result<()> {
        let sink = sink.ok_or_else(|| io::Error::new(io::ErrorKind::Other, "null sink not open"))?;
        flush_std();

        // SAFETY: plain descriptor calls on fds this process owns.
        let saved = unsafe { libc::dup(slot.fd) };
        if saved < 0 {
            return Err(io::Error::last_os_error());
        }
        if unsafe { libc::dup2(sink, slot.fd) } < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(saved) };
            return Err(err);
        }

        slot.saved = saved;
        Ok(())
    }

    /// Undo one level of redirection per held slot. Returns how many descriptors
    /// could not be put back.
    pub(super) fn restore(slots: &mut [Slot], held: &[bool; 2]) -> usize {
        let mut failed = 0;
        for (i, slot) in slots.iter_mut().enumerate() {
            if !held[i] || slot.depth == 0 {
                continue;
            }
            slot.depth -= 1;
            if slot.depth == 0 && slot.saved >= 0 {
                flush_std();
                // SAFETY: `saved` was produced by dup() in `redirect` and is closed once.
                if unsafe { libc::dup2(slot.saved, slot.fd) } < 0 {
                    debug!(
                        "Failed to restore fd {}: {}",
                        slot.fd,
                        io::Error::last_os_error()
                    );
                    failed += 1;
                }
                unsafe { libc::close(slot.saved) };
                slot.saved = -1;
            }
        }
        failed
    }

    pub(super) fn release(held: &[bool; 2]) {
        let mut slots = lock();
        restore(&mut slots[..], held);
    }
}

#[cfg(not(unix))]
mod imp {
    use super::{QuietGuard, Streams};
    use std::io;

    pub(super) fn acquire(_streams: Streams) -> io::Result<QuietGuard> {
        Ok(QuietGuard { held: [false; 2] })
    }

    pub(super) fn release(_held: &[bool; 2]) {}
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs::File;
    use std::os::unix::io::AsRawFd;
    use std::sync::Mutex;

    // Descriptor identity checks are process-wide, so these tests take turns.
    static SERIAL: Mutex<()> = Mutex::new(());

    fn identity(fd: i32) -> (u64, u64) {
        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        assert_eq!(unsafe { libc::fstat(fd, &mut st) }, 0);
        (st.st_dev as u64, st.st_ino as u64)
    }

    fn null_identity() -> (u64, u64) {
        let null = File::open("/dev/null").unwrap();
        identity(null.as_raw_fd())
    }

    #[test]
    fn test_streams_point_at_null_inside_scope() {
        let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let before_out = identity(1);
        let before_err = identity(2);

        {
            let _guard = suppress_output(Streams::Both).unwrap();
            assert_eq!(identity(1), null_identity());
            assert_eq!(identity(2), null_identity());
        }

        assert_eq!(identity(1), before_out);
        assert_eq!(identity(2), before_err);
    }

    #[test]
    fn test_single_stream_leaves_other_alone() {
        let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let before_out = identity(1);
        let before_err = identity(2);

        {
            let _guard = suppress_output(Streams::Stderr).unwrap();
            assert_eq!(identity(1), before_out);
            assert_eq!(identity(2), null_identity());
        }

        assert_eq!(identity(2), before_err);
    }

    #[test]
    fn test_restored_after_panic() {
        let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let before_out = identity(1);
        let before_err = identity(2);

        let result = std::panic::catch_unwind(|| {
            let _guard = suppress_output(Streams::Both).unwrap();
            panic!("backend init blew up");
        });

        assert!(result.is_err());
        assert_eq!(identity(1), before_out);
        assert_eq!(identity(2), before_err);
    }

    #[test]
    fn test_nested_guards_restore_on_last_drop() {
        let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let before_err = identity(2);

        let outer = suppress_output(Streams::Both).unwrap();
        let inner = suppress_output(Streams::Stderr).unwrap();

        // Out-of-order release must not restore while the inner guard lives.
        drop(outer);
        assert_eq!(identity(2), null_identity());

        drop(inner);
        assert_eq!(identity(2), before_err);
    }

    #[test]
    fn test_quietly_returns_closure_value() {
        let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let value = quietly(Streams::Both, || 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_failed_restore_is_counted_and_slot_cleared() {
        let null = File::open("/dev/null").unwrap();
        let saved = unsafe { libc::dup(null.as_raw_fd()) };
        assert!(saved >= 0);

        // -1 is never a valid target, so putting the saved descriptor back fails.
        let mut slots = [imp::Slot::new(-1), imp::Slot::new(-1)];
        slots[0].depth = 1;
        slots[0].saved = saved;

        assert_eq!(imp::restore(&mut slots, &[true, false]), 1);
        assert_eq!(slots[0].depth, 0);
        assert_eq!(slots[0].saved, -1);
    }
}
