use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Category assigned to prompts that match no configured list
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Category whose prompts must be refused
pub const UNSAFE_CATEGORY: &str = "unsafe";

/// Coarse prompt classification, e.g. `safe`, `unsafe` or `unknown`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_CATEGORY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unsafe(&self) -> bool {
        self.0 == UNSAFE_CATEGORY
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One prompt with the responses of both models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePair {
    pub prompt: String,
    /// Baseline ("vanilla") response
    pub response_a: String,
    /// Policy-optimized ("PPO") response
    pub response_b: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl ResponsePair {
    pub fn new(
        prompt: impl Into<String>,
        response_a: impl Into<String>,
        response_b: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            response_a: response_a.into(),
            response_b: response_b.into(),
            category: None,
        }
    }
}

/// Which side of a pair was preferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    AWins,
    BWins,
    Tie,
}

impl Outcome {
    /// Strict comparison; unordered (NaN) scores tie
    pub fn from_scores(score_a: f64, score_b: f64) -> Self {
        match score_a.partial_cmp(&score_b) {
            Some(Ordering::Greater) => Outcome::AWins,
            Some(Ordering::Less) => Outcome::BWins,
            _ => Outcome::Tie,
        }
    }
}

/// Scores of both responses in a pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score_a: f64,
    pub score_b: f64,
    pub outcome: Outcome,
}

impl ScoreResult {
    pub fn new(score_a: f64, score_b: f64) -> Self {
        Self {
            score_a,
            score_b,
            outcome: Outcome::from_scores(score_a, score_b),
        }
    }
}

/// What a strategy produced for one pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Judgement {
    /// Direct comparison without standalone scores
    Compared { outcome: Outcome },
    Scored(ScoreResult),
}

impl Judgement {
    pub fn outcome(&self) -> Outcome {
        match self {
            Judgement::Compared { outcome } => *outcome,
            Judgement::Scored(score) => score.outcome,
        }
    }

    pub fn scores(&self) -> Option<(f64, f64)> {
        match self {
            Judgement::Compared { .. } => None,
            Judgement::Scored(score) => Some((score.score_a, score.score_b)),
        }
    }
}

/// Per-row record kept for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowResult {
    pub prompt: String,
    pub category: Category,
    pub judgement: Judgement,
}

/// Mean scores for one prompt category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub count: usize,
    pub mean_a: f64,
    pub mean_b: f64,
}

/// Finalized win/tie counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub wins_a: usize,
    pub wins_b: usize,
    pub ties: usize,
    /// Present only when category breakdown is enabled, in first-seen order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategorySummary>,
}

/// Complete result of one configured evaluation
#[derive(Debug, Serialize, Deserialize)]
pub struct FinalResults {
    pub title: String,
    pub strategy: String,
    pub vanilla_label: String,
    pub ppo_label: String,
    pub summary: ReportSummary,
    /// Individual pair results
    pub results: Vec<RowResult>,
}
