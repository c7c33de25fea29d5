/// Consecutive-answer counters shared by both progression variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComboState {
    pub combo: u32,
    pub best_combo: u32,
    pub consecutive_wrong: u32,
}

impl ComboState {
    /// Counters after one more graded answer.
    #[must_use]
    pub fn record(self, is_correct: bool) -> Self {
        if is_correct {
            let combo = self.combo.saturating_add(1);
            Self {
                combo,
                best_combo: self.best_combo.max(combo),
                consecutive_wrong: 0,
            }
        } else {
            Self {
                combo: 0,
                best_combo: self.best_combo,
                consecutive_wrong: self.consecutive_wrong.saturating_add(1),
            }
        }
    }
}
