use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

/// Fixed-period timing source running on a dedicated thread
///
/// The callback is invoked once per period. Missed deadlines are not made up:
/// if a tick overruns, the schedule restarts from the current instant.
pub struct TickDriver {
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TickDriver {
    /// Start invoking `callback` every `period`
    pub fn start<F>(period: Duration, callback: F) -> std::io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicU64::new(0));
        let thread_running = Arc::clone(&running);
        let thread_ticks = Arc::clone(&ticks);

        let handle = thread::Builder::new()
            .name("audio-tick".to_string())
            .spawn(move || {
                let mut deadline = Instant::now();
                while thread_running.load(Ordering::Acquire) {
                    callback();
                    thread_ticks.fetch_add(1, Ordering::Relaxed);

                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else {
                        deadline = now;
                    }
                }
                debug!("Tick driver exiting");
            })?;

        debug!("Tick driver started with period {:?}", period);
        Ok(Self {
            running,
            ticks,
            handle: Some(handle),
        })
    }

    /// Ticks delivered so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the thread and wait for the current tick to finish
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Tick thread panicked");
            }
        }
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
