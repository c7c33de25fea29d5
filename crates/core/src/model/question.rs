use serde::{Deserialize, Serialize};

use crate::model::{Tier, WordMasteryId};

//
// ─── QUESTION TYPE ─────────────────────────────────────────────────────────────
//

/// Closed set of drill formats the grading service issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Word shown, pick its meaning.
    MeaningChoice,
    /// Meaning shown, pick the word.
    WordChoice,
    /// Word spoken, type it.
    Listening,
    /// Meaning shown, spell the word.
    Spelling,
    /// Sentence with a gap, type the missing word.
    SentenceCloze,
}

impl QuestionType {
    #[must_use]
    pub fn needs_choices(self) -> bool {
        match self {
            QuestionType::MeaningChoice | QuestionType::WordChoice => true,
            QuestionType::Listening | QuestionType::Spelling | QuestionType::SentenceCloze => {
                false
            }
        }
    }

    /// Speech to fire when the question is shown. Formats that test the
    /// written form stay silent so audio does not give the answer away.
    #[must_use]
    pub fn speech_cue(self, context: ContextMode) -> SpeechCue {
        match (self, context) {
            (QuestionType::Listening, _) => SpeechCue::Word,
            (QuestionType::MeaningChoice, ContextMode::Word) => SpeechCue::Word,
            (QuestionType::MeaningChoice, ContextMode::Sentence) => SpeechCue::Sentence,
            (QuestionType::WordChoice | QuestionType::Spelling | QuestionType::SentenceCloze, _) => {
                SpeechCue::Silent
            }
        }
    }
}

/// Whether the prompt is presented bare or embedded in an example sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    #[default]
    Word,
    Sentence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechCue {
    Word,
    Sentence,
    Silent,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// What the learner sees: the word plus whichever hints the format uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptData {
    pub word: String,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub sentence: Option<String>,
}

/// A server-issued question. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub word_mastery_id: WordMasteryId,
    pub prompt_data: PromptData,
    #[serde(flatten)]
    pub tier: Tier,
    pub question_type: QuestionType,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub timer_seconds: Option<u32>,
    #[serde(default)]
    pub context_mode: ContextMode,
    /// Consecutive correct answers needed to leave this question's stage.
    #[serde(default)]
    pub required_streak: Option<u32>,
}

impl Question {
    /// True when the question carries everything its format needs.
    #[must_use]
    pub fn is_presentable(&self) -> bool {
        !self.question_type.needs_choices() || !self.choices.is_empty()
    }

    #[must_use]
    pub fn speech_cue(&self) -> SpeechCue {
        self.question_type.speech_cue(self.context_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Level;

    #[test]
    fn question_deserializes_with_flattened_tier() {
        let raw = r#"{
            "wordMasteryId": 11,
            "promptData": {"word": "brisk", "meaning": "quick and energetic"},
            "level": 4,
            "questionType": "meaning_choice",
            "choices": ["quick and energetic", "slow", "sad", "bright"],
            "timerSeconds": 15
        }"#;
        let question: Question = serde_json::from_str(raw).unwrap();
        assert_eq!(question.word_mastery_id, WordMasteryId::new(11));
        assert_eq!(question.tier, Tier::Level(Level::new(4).unwrap()));
        assert_eq!(question.context_mode, ContextMode::Word);
        assert_eq!(question.required_streak, None);
        assert!(question.is_presentable());
    }

    #[test]
    fn choice_formats_without_choices_are_not_presentable() {
        let raw = r#"{
            "wordMasteryId": 3,
            "promptData": {"word": "lucid"},
            "stage": 2,
            "questionType": "word_choice"
        }"#;
        let question: Question = serde_json::from_str(raw).unwrap();
        assert!(!question.is_presentable());
    }

    #[test]
    fn speech_cues_never_reveal_written_answers() {
        assert_eq!(
            QuestionType::Spelling.speech_cue(ContextMode::Sentence),
            SpeechCue::Silent
        );
        assert_eq!(
            QuestionType::Listening.speech_cue(ContextMode::Word),
            SpeechCue::Word
        );
        assert_eq!(
            QuestionType::MeaningChoice.speech_cue(ContextMode::Sentence),
            SpeechCue::Sentence
        );
    }
}
