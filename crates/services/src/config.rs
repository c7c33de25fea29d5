use std::time::Duration;

/// Engine tuning. Per-question timers from the service take precedence over
/// `default_question_seconds`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub default_question_seconds: u32,
    pub warn_at_seconds: u32,
    pub session_time_limit: Option<u32>,
    pub shuffle_choices: bool,
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_question_seconds: 20,
            warn_at_seconds: 5,
            session_time_limit: None,
            shuffle_choices: false,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_default_question_seconds(mut self, seconds: u32) -> Self {
        self.default_question_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_warn_at_seconds(mut self, seconds: u32) -> Self {
        self.warn_at_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_time_limit(mut self, seconds: Option<u32>) -> Self {
        self.session_time_limit = seconds;
        self
    }

    #[must_use]
    pub fn with_shuffle_choices(mut self, shuffle: bool) -> Self {
        self.shuffle_choices = shuffle;
        self
    }

    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}
