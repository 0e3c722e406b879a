//! Background reaper.
//!
//! Lazy expiration only removes entries that are read again. The reaper
//! periodically sweeps every shard so expired entries that are never touched
//! still get released.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

const THREAD_NAME: &str = "shardcache-reaper";

/// Handle to the running reaper thread.
///
/// Dropping the shutdown sender disconnects the channel the thread waits on,
/// so it wakes immediately instead of at its next tick.
pub(crate) struct Reaper {
    shutdown: Sender<()>,
    handle: JoinHandle<()>,
}

impl Reaper {
    /// Start a thread that calls `sweep` once per `interval` until stopped.
    ///
    /// `sweep` covers `shards` shards and returns the number of entries it
    /// removed.
    pub fn spawn<F>(interval: Duration, shards: usize, sweep: F) -> io::Result<Self>
    where
        F: Fn() -> usize + Send + 'static,
    {
        let (shutdown, signal) = channel::bounded(1);
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(interval, signal, sweep))?;

        info!(interval_ms = interval.as_millis() as u64, shards, "reaper started");
        Ok(Self { shutdown, handle })
    }

    /// Signal the thread and wait until it has exited.
    pub fn stop(self) {
        let Reaper { shutdown, handle } = self;
        drop(shutdown);
        if handle.join().is_err() {
            error!("reaper thread panicked");
        }
        info!("reaper stopped");
    }
}

fn run<F>(interval: Duration, signal: Receiver<()>, sweep: F)
where
    F: Fn() -> usize,
{
    loop {
        match signal.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let started = Instant::now();
                let removed = sweep();
                if removed > 0 {
                    debug!(
                        removed,
                        elapsed_us = started.elapsed().as_micros() as u64,
                        "reaper pass removed expired entries"
                    );
                } else {
                    trace!("reaper pass found nothing to remove");
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
