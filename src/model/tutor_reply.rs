use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::session::{MistakeKind, Scene};

/// What the tutor suggests doing next. Purely informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    AskRepeat,
    GiveHint,
    AdvanceScene,
    AskChoice,
    #[serde(other)]
    Unknown,
}

/// Per-turn tracking block appended to ordinary tutor replies.
///
/// Only `scene` must be present. Every other field may be missing, `null`
/// or of the wrong type; a bad value reads as `None` instead of rejecting
/// the whole block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TurnMetadata {
    /// `None` when the model named a scene outside the closed set.
    #[serde(deserialize_with = "lenient_scene")]
    pub scene: Option<Scene>,
    #[serde(default, deserialize_with = "lenient")]
    pub learner_utt: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub quantifier_used: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_quantifier_correct: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub mistake_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub attempts_on_point: Option<u32>,
    /// Integral floats such as `1.0` are accepted.
    #[serde(default, deserialize_with = "lenient_integer")]
    pub score_delta: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub next_action: Option<NextAction>,
}

impl TurnMetadata {
    /// True when a category other than `none` is named.
    pub fn declares_mistake(&self) -> bool {
        matches!(self.mistake_type.as_deref(), Some(label) if !label.is_empty() && label != "none")
    }

    /// Only an explicit `false` counts as a wrong answer; `null` does not.
    pub fn is_marked_incorrect(&self) -> bool {
        self.is_quantifier_correct == Some(false)
    }

    pub fn mistake_kind(&self) -> Option<MistakeKind> {
        self.mistake_type.as_deref().and_then(MistakeKind::from_label)
    }
}

/// End-of-session block, sent once the learner says "finish" or "done".
///
/// The `total_turns` key alone makes a block a summary, so every field
/// falls back to zero (or an empty map) rather than failing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionSummary {
    #[serde(default, deserialize_with = "count_or_zero")]
    pub total_turns: u32,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub total_errors: u32,
    #[serde(default, deserialize_with = "counts_by_label")]
    pub errors_by_type: BTreeMap<String, u32>,
    #[serde(default, deserialize_with = "integer_or_zero")]
    pub final_score: i64,
}

/* =========================
   Lenient field decoding
   ========================= */

/// Whole numbers, including floats with no fractional part.
fn integral(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            // `as` saturates at the i64 bounds.
            .map(|f| f as i64)
    })
}

fn count(value: &Value) -> Option<u32> {
    integral(value).and_then(|n| u32::try_from(n).ok())
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(integral(&Value::deserialize(deserializer)?))
}

fn lenient_scene<'de, D>(deserializer: D) -> Result<Option<Scene>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(Scene::from_label))
}

fn count_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(count(&Value::deserialize(deserializer)?).unwrap_or(0))
}

fn integer_or_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(integral(&Value::deserialize(deserializer)?).unwrap_or(0))
}

/// Entries whose count is not a whole non-negative number are skipped.
fn counts_by_label<'de, D>(deserializer: D) -> Result<BTreeMap<String, u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(map) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(label, value)| count(&value).map(|n| (label, n)))
        .collect())
}

/// Structured data recovered from the tail of a reply. A reply carries at
/// most one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyData {
    Turn(TurnMetadata),
    Summary(SessionSummary),
}

/// A model reply split into what the learner reads and what the app tracks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedReply {
    pub display_text: String,
    pub data: Option<ReplyData>,
    /// A trailing block was present but could not be read, so this turn
    /// was not scored.
    pub block_rejected: bool,
}

impl ParsedReply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            display_text: text.into(),
            ..Self::default()
        }
    }

    pub fn turn_metadata(&self) -> Option<&TurnMetadata> {
        match &self.data {
            Some(ReplyData::Turn(meta)) => Some(meta),
            _ => None,
        }
    }

    pub fn session_summary(&self) -> Option<&SessionSummary> {
        match &self.data {
            Some(ReplyData::Summary(summary)) => Some(summary),
            _ => None,
        }
    }
}
