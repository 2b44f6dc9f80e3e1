//! Domain types for the math adventure app.

use chrono::{DateTime, Utc};
use ratatui::style::Color;
use serde::Deserialize;

/// A curriculum unit the learner can pick from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    /// Unique identifier.
    pub id: &'static str,
    /// Display title.
    pub title: &'static str,
    /// Short pitch shown on the topic card.
    pub description: &'static str,
    /// Card icon.
    pub icon: TopicIcon,
    /// Accent color for the card.
    pub color: Color,
    /// Curriculum category.
    pub category: TopicCategory,
}

/// Curriculum category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicCategory {
    Calculation,
    Geometry,
    Concept,
    Logic,
}

impl TopicCategory {
    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Calculation => "计算",
            Self::Geometry => "几何",
            Self::Concept => "概念",
            Self::Logic => "逻辑",
        }
    }
}

/// Topic card icon, resolved to a glyph at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopicIcon {
    Calculator,
    Square,
    Calendar,
    Times,
    Cube,
    Trophy,
    /// Fallback for topics without a dedicated icon.
    #[default]
    Generic,
}

impl TopicIcon {
    /// Get the terminal glyph.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Calculator => "🔢",
            Self::Square => "⬜",
            Self::Calendar => "📅",
            Self::Times => "✖️",
            Self::Cube => "📦",
            Self::Trophy => "🏆",
            Self::Generic => "✨",
        }
    }
}

/// Quiz difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// All tiers, in ascending order.
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// Get display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Easy => "基础巩固",
            Self::Medium => "能力提升",
            Self::Hard => "奥数挑战",
        }
    }

    /// Get the grading criteria sent with quiz prompts.
    pub fn criteria(&self) -> &'static str {
        match self {
            Self::Easy => "课本基础题，直接计算或定义。",
            Self::Medium => "稍微复杂的应用题，需要两步思考。",
            Self::Hard => "简单的逻辑推理或经典奥数题（如简单的鸡兔同笼变体，简单的周期问题）。",
        }
    }

    /// Get the next tier, wrapping around.
    pub fn next(&self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            Self::Medium => Self::Hard,
            Self::Hard => Self::Easy,
        }
    }
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Wire name used by the provider API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One turn in the tutor conversation. Append-only, never edited.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a learner message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a tutor message.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The number of options every quiz question must carry.
pub const OPTION_COUNT: usize = 4;

/// A multiple-choice question produced by the provider.
///
/// Deserialized from untrusted JSON; always run [`QuizQuestion::is_well_formed`]
/// before trusting `correct_answer` as an index.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
}

impl QuizQuestion {
    /// Check the option arity and answer index invariants.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == OPTION_COUNT && self.correct_answer < self.options.len()
    }
}

/// Cumulative session statistics. Reset when the process exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserStats {
    pub topics_completed: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub stars: u32,
}

impl UserStats {
    /// Record one answered question. One star per correct answer.
    pub fn record_answer(&mut self, is_correct: bool) {
        self.total_questions += 1;
        if is_correct {
            self.correct_answers += 1;
            self.stars += 1;
        }
    }

    /// Fraction of questions answered correctly.
    pub fn accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            f64::from(self.correct_answers) / f64::from(self.total_questions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: usize, correct: usize) -> QuizQuestion {
        QuizQuestion {
            id: 1,
            question: "3 × 4 = ?".to_string(),
            options: (0..options).map(|i| i.to_string()).collect(),
            correct_answer: correct,
            explanation: "乘法口诀：三四十二。".to_string(),
        }
    }

    #[test]
    fn question_well_formedness() {
        assert!(question(4, 0).is_well_formed());
        assert!(question(4, 3).is_well_formed());
        assert!(!question(4, 4).is_well_formed());
        assert!(!question(3, 0).is_well_formed());
        assert!(!question(5, 1).is_well_formed());
    }

    #[test]
    fn stats_accumulate_monotonically() {
        let mut stats = UserStats::default();
        for i in 0..10 {
            stats.record_answer(i % 3 == 0);
            assert!(stats.correct_answers <= stats.total_questions);
            assert_eq!(stats.stars, stats.correct_answers);
        }
        assert_eq!(stats.total_questions, 10);
        assert_eq!(stats.correct_answers, 4);
        assert_eq!(stats.stars, 4);
    }

    #[test]
    fn accuracy_handles_empty_session() {
        let stats = UserStats::default();
        assert_eq!(stats.accuracy(), 0.0);

        let mut stats = UserStats::default();
        stats.record_answer(true);
        stats.record_answer(false);
        assert!((stats.accuracy() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn difficulty_cycles_through_all_tiers() {
        assert_eq!(Difficulty::Easy.next(), Difficulty::Medium);
        assert_eq!(Difficulty::Medium.next(), Difficulty::Hard);
        assert_eq!(Difficulty::Hard.next(), Difficulty::Easy);
    }
}
