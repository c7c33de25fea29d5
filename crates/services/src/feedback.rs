//! Fire-and-forget audio collaborators. The engine never waits on them.

/// Feedback sounds the engine asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    Correct,
    Incorrect,
    AlmostCorrect,
    LevelUp,
    LevelDown,
    Mastered,
    TimerWarning,
    TimerFinal,
}

impl SoundEffect {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SoundEffect::Correct => "correct",
            SoundEffect::Incorrect => "incorrect",
            SoundEffect::AlmostCorrect => "almost_correct",
            SoundEffect::LevelUp => "level_up",
            SoundEffect::LevelDown => "level_down",
            SoundEffect::Mastered => "mastered",
            SoundEffect::TimerWarning => "timer_warning",
            SoundEffect::TimerFinal => "timer_final",
        }
    }
}

/// Pronunciation playback (text-to-speech).
pub trait SpeechPlayer: Send + Sync {
    fn play_word(&self, word: &str);
    fn play_sentence(&self, sentence: &str);
}

pub trait SoundEffects: Send + Sync {
    fn play(&self, effect: SoundEffect);
    fn stop(&self, effect: SoundEffect);
}

/// Plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl SpeechPlayer for Silent {
    fn play_word(&self, _word: &str) {}
    fn play_sentence(&self, _sentence: &str) {}
}

impl SoundEffects for Silent {
    fn play(&self, _effect: SoundEffect) {}
    fn stop(&self, _effect: SoundEffect) {}
}
