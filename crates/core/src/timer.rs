//! Countdown state machine, independent of whatever drives its ticks.
//!
//! `Idle -> Running <-> Paused`, and `Running -> Expired` when the count hits
//! zero. Expiry is reported by exactly one [`TickReport`] per reset.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Expired,
}

/// How urgent the remaining time looks, from the fraction left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgencyBand {
    Calm,
    Caution,
    Warning,
    Critical,
}

impl UrgencyBand {
    #[must_use]
    pub fn from_remaining(seconds_left: u32, total: u32) -> Self {
        if total == 0 {
            return UrgencyBand::Critical;
        }
        let fraction = f64::from(seconds_left) / f64::from(total);
        if fraction > 0.5 {
            UrgencyBand::Calm
        } else if fraction > 0.33 {
            UrgencyBand::Caution
        } else if fraction > 0.25 {
            UrgencyBand::Warning
        } else {
            UrgencyBand::Critical
        }
    }
}

/// Sound cues a countdown raises, each at most once per reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCue {
    /// `seconds_left` reached the configured warning threshold.
    Warning,
    /// Two seconds left.
    Final,
}

/// Seconds left at which the final alert is raised.
pub const FINAL_ALERT_AT: u32 = 2;

/// What one tick observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub seconds_left: u32,
    pub band: UrgencyBand,
    pub cues: Vec<TimerCue>,
    /// Set on the single tick that reached zero.
    pub expired: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    total: u32,
    seconds_left: u32,
    state: TimerState,
    warn_at: u32,
    warned: bool,
    final_alerted: bool,
    fired: bool,
}

impl Countdown {
    #[must_use]
    pub fn new(warn_at: u32) -> Self {
        Self {
            total: 0,
            seconds_left: 0,
            state: TimerState::Idle,
            warn_at,
            warned: false,
            final_alerted: false,
            fired: false,
        }
    }

    /// Start a fresh cycle of `total_seconds`, clearing cue and expiry flags.
    pub fn reset(&mut self, total_seconds: u32) {
        self.total = total_seconds;
        self.seconds_left = total_seconds;
        self.state = TimerState::Running;
        self.warned = false;
        self.final_alerted = false;
        self.fired = false;
    }

    /// Back to `Idle`; ticks are ignored until the next reset.
    pub fn clear(&mut self) {
        self.state = TimerState::Idle;
    }

    /// Returns true if the countdown was running.
    pub fn pause(&mut self) -> bool {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
            true
        } else {
            false
        }
    }

    /// Returns true if the countdown was paused.
    pub fn resume(&mut self) -> bool {
        if self.state == TimerState::Paused {
            self.state = TimerState::Running;
            true
        } else {
            false
        }
    }

    /// Advance one second. `None` unless running.
    pub fn tick(&mut self) -> Option<TickReport> {
        if self.state != TimerState::Running {
            return None;
        }

        self.seconds_left = self.seconds_left.saturating_sub(1);

        let mut cues = Vec::new();
        if !self.warned && self.warn_at > 0 && self.seconds_left == self.warn_at {
            self.warned = true;
            cues.push(TimerCue::Warning);
        }
        if !self.final_alerted && self.seconds_left == FINAL_ALERT_AT {
            self.final_alerted = true;
            cues.push(TimerCue::Final);
        }

        let mut expired = false;
        if self.seconds_left == 0 {
            self.state = TimerState::Expired;
            if !self.fired {
                self.fired = true;
                expired = true;
            }
        }

        Some(TickReport {
            seconds_left: self.seconds_left,
            band: self.band(),
            cues,
            expired,
        })
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    #[must_use]
    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Whole seconds consumed in this cycle.
    #[must_use]
    pub fn elapsed(&self) -> u32 {
        self.total.saturating_sub(self.seconds_left)
    }

    #[must_use]
    pub fn band(&self) -> UrgencyBand {
        UrgencyBand::from_remaining(self.seconds_left, self.total)
    }
}
