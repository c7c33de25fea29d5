//! Drives a [`Countdown`] from a tokio interval and reports over a channel.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

use quiz_core::timer::{Countdown, TimerCue, TimerState, UrgencyBand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Question,
    Session,
}

/// What a running countdown reports. `cycle` identifies the reset that
/// produced the event so receivers can drop leftovers from an earlier cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Tick {
        kind: TimerKind,
        cycle: u64,
        seconds_left: u32,
        band: UrgencyBand,
    },
    Cue {
        kind: TimerKind,
        cycle: u64,
        cue: TimerCue,
    },
    Expired {
        kind: TimerKind,
        cycle: u64,
    },
}

impl TimerEvent {
    #[must_use]
    pub fn kind(&self) -> TimerKind {
        match self {
            TimerEvent::Tick { kind, .. }
            | TimerEvent::Cue { kind, .. }
            | TimerEvent::Expired { kind, .. } => *kind,
        }
    }

    #[must_use]
    pub fn cycle(&self) -> u64 {
        match self {
            TimerEvent::Tick { cycle, .. }
            | TimerEvent::Cue { cycle, .. }
            | TimerEvent::Expired { cycle, .. } => *cycle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub seconds_left: u32,
    pub total: u32,
    pub band: UrgencyBand,
}

pub struct CountdownTimer {
    kind: TimerKind,
    countdown: Arc<Mutex<Countdown>>,
    period: Duration,
    events: UnboundedSender<TimerEvent>,
    cycle: u64,
    task: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    #[must_use]
    pub fn new(
        kind: TimerKind,
        warn_at: u32,
        period: Duration,
        events: UnboundedSender<TimerEvent>,
    ) -> Self {
        Self {
            kind,
            countdown: Arc::new(Mutex::new(Countdown::new(warn_at))),
            period,
            events,
            cycle: 0,
            task: None,
        }
    }

    /// Restart from `total_seconds`. Must be called inside a tokio runtime.
    pub fn reset(&mut self, total_seconds: u32) {
        self.abort();
        self.cycle += 1;
        if let Ok(mut countdown) = self.countdown.lock() {
            countdown.reset(total_seconds);
        }
        debug!(kind = ?self.kind, cycle = self.cycle, total_seconds, "countdown reset");
        self.task = Some(tokio::spawn(run(
            self.kind,
            self.cycle,
            Arc::clone(&self.countdown),
            self.period,
            self.events.clone(),
        )));
    }

    pub fn pause(&self) -> bool {
        self.countdown.lock().is_ok_and(|mut c| c.pause())
    }

    pub fn resume(&self) -> bool {
        self.countdown.lock().is_ok_and(|mut c| c.resume())
    }

    /// Stop ticking and return to idle.
    pub fn stop(&mut self) {
        self.abort();
        self.cycle += 1;
        if let Ok(mut countdown) = self.countdown.lock() {
            countdown.clear();
        }
    }

    #[must_use]
    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    #[must_use]
    pub fn snapshot(&self) -> TimerSnapshot {
        match self.countdown.lock() {
            Ok(c) => TimerSnapshot {
                state: c.state(),
                seconds_left: c.seconds_left(),
                total: c.total(),
                band: c.band(),
            },
            Err(_) => TimerSnapshot {
                state: TimerState::Idle,
                seconds_left: 0,
                total: 0,
                band: UrgencyBand::Critical,
            },
        }
    }

    /// Whole seconds consumed in the current cycle.
    #[must_use]
    pub fn elapsed(&self) -> u32 {
        self.countdown.lock().map_or(0, |c| c.elapsed())
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn run(
    kind: TimerKind,
    cycle: u64,
    countdown: Arc<Mutex<Countdown>>,
    period: Duration,
    events: UnboundedSender<TimerEvent>,
) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let report = {
            let Ok(mut countdown) = countdown.lock() else {
                break;
            };
            countdown.tick()
        };
        let Some(report) = report else {
            continue;
        };

        // Zero goes out before expiry so receivers can render it first.
        let tick = TimerEvent::Tick {
            kind,
            cycle,
            seconds_left: report.seconds_left,
            band: report.band,
        };
        if events.send(tick).is_err() {
            break;
        }
        for cue in report.cues {
            let _ = events.send(TimerEvent::Cue { kind, cycle, cue });
        }
        if report.expired {
            debug!(?kind, cycle, "countdown expired");
            let _ = events.send(TimerEvent::Expired { kind, cycle });
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn collect_until_expired(
        rx: &mut mpsc::UnboundedReceiver<TimerEvent>,
    ) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = matches!(event, TimerEvent::Expired { .. });
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_fires_once_after_zero_is_reported() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new(TimerKind::Question, 0, Duration::from_secs(1), tx);
        timer.reset(5);

        let events = collect_until_expired(&mut rx).await;
        let ticks: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                TimerEvent::Tick { seconds_left, .. } => Some(*seconds_left),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![4, 3, 2, 1, 0]);
        assert!(matches!(events.last(), Some(TimerEvent::Expired { .. })));
        assert!(matches!(
            events[events.len() - 2],
            TimerEvent::Tick { seconds_left: 0, .. }
        ));

        let more = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await;
        assert!(more.is_err(), "no events after expiry");
        assert_eq!(timer.snapshot().state, TimerState::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_holds_seconds_until_resume() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new(TimerKind::Question, 0, Duration::from_secs(1), tx);
        timer.reset(5);

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, TimerEvent::Tick { seconds_left: 4, .. }));
        assert!(timer.pause());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(timer.snapshot().seconds_left, 4);

        assert!(timer.resume());
        let next = rx.recv().await.unwrap();
        assert!(matches!(next, TimerEvent::Tick { seconds_left: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn cues_arrive_after_their_tick() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new(TimerKind::Session, 3, Duration::from_secs(1), tx);
        timer.reset(4);

        let events = collect_until_expired(&mut rx).await;
        let cues: Vec<(usize, TimerCue)> = events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e {
                TimerEvent::Cue { cue, .. } => Some((i, *cue)),
                _ => None,
            })
            .collect();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].1, TimerCue::Warning);
        assert!(matches!(
            events[cues[0].0 - 1],
            TimerEvent::Tick { seconds_left: 3, .. }
        ));
        assert_eq!(cues[1].1, TimerCue::Final);
        assert!(events.iter().all(|e| e.kind() == TimerKind::Session));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_starts_a_new_cycle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new(TimerKind::Question, 0, Duration::from_secs(1), tx);
        timer.reset(5);
        let first_cycle = timer.cycle();
        timer.reset(2);
        assert!(timer.cycle() > first_cycle);

        let events = collect_until_expired(&mut rx).await;
        assert!(events.iter().all(|e| e.cycle() == timer.cycle()));
        assert_eq!(events.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_silences_the_countdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new(TimerKind::Question, 0, Duration::from_secs(1), tx);
        timer.reset(3);
        timer.stop();
        let more = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await;
        assert!(more.is_err());
        assert_eq!(timer.snapshot().state, TimerState::Idle);
    }
}
