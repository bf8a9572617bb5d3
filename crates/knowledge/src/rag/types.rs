//! Question-answering result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::num::{IntErrorKind, ParseIntError};

/// Output of the answer generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub query: String,
    pub context: String,
    pub answer: String,
    pub rationale: String,
}

/// Faithfulness score reported by the evaluator.
///
/// Normally an integer on a 0-10 scale. When the model's raw value holds no
/// digits at all it is kept verbatim as `Unparsed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccuracyMetric {
    Score(i64),
    Unparsed(String),
}

impl AccuracyMetric {
    /// Normalize a raw textual metric.
    ///
    /// A value that parses as an integer after trimming is used directly.
    /// Otherwise the first run of ASCII digits is taken, so
    /// `"Score: 9 out of 10"` becomes 9. Text without digits passes through.
    /// Values are not clamped to the 0-10 scale; numbers beyond `i64`
    /// saturate.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(score) => return Self::Score(score),
            Err(e) => {
                if let Some(score) = saturate(&e, raw) {
                    return Self::Score(score);
                }
            }
        }

        let digits: String = raw
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();

        if digits.is_empty() {
            tracing::warn!("Accuracy metric has no numeric value, keeping raw: {:?}", raw);
            return Self::Unparsed(raw.to_string());
        }

        match digits.parse::<i64>() {
            Ok(score) => Self::Score(score),
            Err(e) => match saturate(&e, raw) {
                Some(score) => Self::Score(score),
                None => {
                    tracing::warn!("Accuracy metric could not be parsed, keeping raw: {:?}", raw);
                    Self::Unparsed(raw.to_string())
                }
            },
        }
    }

    /// Normalize a parsed output value; JSON integers are used as is.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(score) => Self::Score(score),
                None => Self::normalize(&n.to_string()),
            },
            Value::String(s) => Self::normalize(s),
            other => Self::normalize(&other.to_string()),
        }
    }

    pub fn score(&self) -> Option<i64> {
        match self {
            Self::Score(score) => Some(*score),
            Self::Unparsed(_) => None,
        }
    }
}

fn saturate(e: &ParseIntError, raw: &str) -> Option<i64> {
    let score = match e.kind() {
        IntErrorKind::PosOverflow => i64::MAX,
        IntErrorKind::NegOverflow => i64::MIN,
        _ => return None,
    };
    tracing::warn!("Accuracy metric overflows i64, saturating to {}: {:?}", score, raw);
    Some(score)
}

impl fmt::Display for AccuracyMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Score(score) => write!(f, "{}", score),
            Self::Unparsed(raw) => f.write_str(raw),
        }
    }
}

/// Output of the answer evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub query: String,
    pub context: String,
    pub answer: String,
    pub rationale: String,
    pub accuracy_metric: AccuracyMetric,
    pub rationale_metric: String,
}

/// Combined result of one assistant call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub query: String,
    pub context: String,
    pub answer: String,
    pub answer_rationale: String,
    pub accuracy_metric: AccuracyMetric,
    pub rationale_metric: String,
}

impl From<Evaluation> for AssistantResponse {
    fn from(evaluation: Evaluation) -> Self {
        Self {
            query: evaluation.query,
            context: evaluation.context,
            answer: evaluation.answer,
            answer_rationale: evaluation.rationale,
            accuracy_metric: evaluation.accuracy_metric,
            rationale_metric: evaluation.rationale_metric,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_numeric_string() {
        assert_eq!(AccuracyMetric::normalize("7"), AccuracyMetric::Score(7));
        assert_eq!(AccuracyMetric::normalize(" 10\n"), AccuracyMetric::Score(10));
    }

    #[test]
    fn test_normalize_embedded_digits() {
        assert_eq!(
            AccuracyMetric::normalize("Score: 9 out of 10"),
            AccuracyMetric::Score(9)
        );
        assert_eq!(AccuracyMetric::normalize("8/10"), AccuracyMetric::Score(8));
    }

    #[test]
    fn test_normalize_passthrough() {
        assert_eq!(
            AccuracyMetric::normalize("no digits here"),
            AccuracyMetric::Unparsed("no digits here".to_string())
        );
    }

    #[test]
    fn test_normalize_is_not_clamped() {
        assert_eq!(AccuracyMetric::normalize("42"), AccuracyMetric::Score(42));
        assert_eq!(AccuracyMetric::normalize("-3"), AccuracyMetric::Score(-3));
    }

    #[test]
    fn test_normalize_saturates_overflow() {
        assert_eq!(
            AccuracyMetric::normalize("Score: 99999999999999999999"),
            AccuracyMetric::Score(i64::MAX)
        );
        assert_eq!(
            AccuracyMetric::normalize("99999999999999999999"),
            AccuracyMetric::Score(i64::MAX)
        );
        assert_eq!(
            AccuracyMetric::normalize(" -99999999999999999999 "),
            AccuracyMetric::Score(i64::MIN)
        );
        assert_eq!(
            AccuracyMetric::from_value(&json!(18446744073709551615u64)),
            AccuracyMetric::Score(i64::MAX)
        );
    }

    #[test]
    fn test_from_value() {
        assert_eq!(AccuracyMetric::from_value(&json!(8)), AccuracyMetric::Score(8));
        assert_eq!(AccuracyMetric::from_value(&json!("6")), AccuracyMetric::Score(6));
        assert_eq!(AccuracyMetric::from_value(&json!(7.5)), AccuracyMetric::Score(7));
    }

    #[test]
    fn test_metric_serializes_untagged() {
        assert_eq!(serde_json::to_value(AccuracyMetric::Score(9)).unwrap(), json!(9));
        assert_eq!(
            serde_json::to_value(AccuracyMetric::Unparsed("n/a".to_string())).unwrap(),
            json!("n/a")
        );
    }
}
