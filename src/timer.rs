//! Periodic tick source.
//!
//! Each firing posts a [`TimerEvent`] carrying the milliseconds since the last
//! tick that actually made it into the queue (or since registration). Drift is
//! not corrected: the interval is approximate wall-clock time.

use crate::channel::EventSender;
use crate::error::{Error, Result};
use crate::event::{Event, TimerEvent};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Shortest interval accepted; shorter values are clamped.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Arms and disarms the tick thread.
pub struct TickTimer {
    interval: Duration,
    worker: Option<Worker>,
    #[cfg(test)]
    refuse: Option<&'static str>,
}

impl TickTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_TICK_INTERVAL),
            worker: None,
            #[cfg(test)]
            refuse: None,
        }
    }

    /// A timer whose `register` always fails with `reason`.
    #[cfg(test)]
    pub(crate) fn failing(interval: Duration, reason: &'static str) -> Self {
        let mut timer = Self::new(interval);
        timer.refuse = Some(reason);
        timer
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start posting ticks into `sender`. Registering twice is a no-op.
    pub(crate) fn register(&mut self, sender: EventSender) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        #[cfg(test)]
        if let Some(reason) = self.refuse {
            return Err(Error::TimerFailed(reason.into()));
        }

        let (stop, stop_rx) = mpsc::channel();
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name("quasimode-tick".into())
            .spawn(move || tick_loop(interval, stop_rx, sender))
            .map_err(|e| Error::TimerFailed(e.to_string()))?;

        self.worker = Some(Worker { stop, handle });
        log::debug!("tick timer armed at {:?}", interval);
        Ok(())
    }

    /// Stop the tick thread and wait for it. Idempotent.
    pub fn unregister(&mut self) {
        if let Some(worker) = self.worker.take() {
            // Dropping the sender disconnects the worker's wait immediately.
            drop(worker.stop);
            if worker.handle.join().is_err() {
                log::warn!("tick thread panicked");
            }
            log::debug!("tick timer disarmed");
        }
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.unregister();
    }
}

fn tick_loop(interval: Duration, stop: Receiver<()>, sender: EventSender) {
    let mut last = Instant::now();
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                let elapsed_ms = now.duration_since(last).as_millis() as u64;
                // A dropped tick folds its time into the next one.
                if sender.post_input(Event::Tick(TimerEvent { elapsed_ms })) {
                    last = now;
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::event_queue;

    #[test]
    fn test_ticks_carry_elapsed_time() {
        let (tx, rx) = event_queue(64);
        let mut timer = TickTimer::new(Duration::from_millis(5));
        timer.register(tx).unwrap();
        assert!(timer.worker.is_some());

        let mut total = 0;
        for _ in 0..3 {
            match rx.recv_timeout(Duration::from_secs(5)) {
                Some(Event::Tick(TimerEvent { elapsed_ms })) => {
                    assert!(elapsed_ms >= 4, "tick too early: {elapsed_ms}ms");
                    total += elapsed_ms;
                }
                other => panic!("expected tick, got {other:?}"),
            }
        }
        assert!(total >= 12);
        timer.unregister();
    }

    #[test]
    fn test_unregister_is_idempotent_and_stops_ticks() {
        let (tx, rx) = event_queue(64);
        let mut timer = TickTimer::new(Duration::from_millis(2));
        timer.unregister();

        timer.register(tx).unwrap();
        timer.unregister();
        timer.unregister();
        assert!(timer.worker.is_none());

        while rx.recv_timeout(Duration::from_millis(1)).is_some() {}
        assert_eq!(rx.recv_timeout(Duration::from_millis(30)), None);
    }

    #[test]
    fn test_failing_timer_never_ticks() {
        let (tx, rx) = event_queue(4);
        let mut timer = TickTimer::failing(Duration::from_millis(1), "no timer");
        assert!(matches!(
            timer.register(tx),
            Err(Error::TimerFailed(reason)) if reason == "no timer"
        ));
        assert!(timer.worker.is_none());
        assert_eq!(rx.recv_timeout(Duration::from_millis(20)), None);
    }

    #[test]
    fn test_interval_clamped() {
        let timer = TickTimer::new(Duration::ZERO);
        assert_eq!(timer.interval(), MIN_TICK_INTERVAL);
    }

    #[test]
    fn test_full_queue_accumulates_elapsed() {
        let (tx, rx) = event_queue(1);
        let mut timer = TickTimer::new(Duration::from_millis(5));
        timer.register(tx).unwrap();

        // Let several firings hit the full queue before draining it.
        thread::sleep(Duration::from_millis(40));
        let first = rx.recv_timeout(Duration::from_secs(5));
        let second = rx.recv_timeout(Duration::from_secs(5));
        timer.unregister();

        assert!(matches!(first, Some(Event::Tick(_))));
        match second {
            Some(Event::Tick(TimerEvent { elapsed_ms })) => assert!(elapsed_ms >= 20),
            other => panic!("expected tick, got {other:?}"),
        }
    }
}
