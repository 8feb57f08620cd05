//! Condition text classification
//!
//! Maps the free-form condition text reported by the weather provider to a
//! display icon id and a coarse effect category. Matching is case-insensitive
//! substring search against an ordered keyword list; the first matching
//! category wins, so the order below is load-bearing (thunderstorms must not
//! fall through to a rain-adjacent match).

use serde::{Deserialize, Serialize};

/// Coarse visual effect category for a weather condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// No recognizable condition
    #[default]
    None,
    Rain,
    Snow,
    Fog,
    Sun,
    Clouds,
    Thunderstorm,
}

/// Result of classifying a condition string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Display icon identifier
    pub icon: &'static str,
    /// Effect category
    pub effect: Effect,
}

/// Icon id used when no keyword matches
pub const FALLBACK_ICON: &str = "questionmark";

/// Classifies a condition string into an icon and effect category
///
/// Total function: never fails, unknown input maps to the fallback icon
/// and `Effect::None`.
pub fn classify(condition: &str) -> Classification {
    let lower = condition.to_lowercase();

    if lower.contains("rain") {
        Classification {
            icon: "cloud.rain",
            effect: Effect::Rain,
        }
    } else if lower.contains("snow") {
        Classification {
            icon: "snow",
            effect: Effect::Snow,
        }
    } else if lower.contains("fog") || lower.contains("mist") || lower.contains("haze") {
        Classification {
            icon: "cloud.fog",
            effect: Effect::Fog,
        }
    } else if lower.contains("thunder") || lower.contains("storm") {
        Classification {
            icon: "cloud.bolt.rain",
            effect: Effect::Thunderstorm,
        }
    } else if lower.contains("clear") || lower.contains("sun") {
        Classification {
            icon: "sun.max",
            effect: Effect::Sun,
        }
    } else if lower.contains("cloud") {
        Classification {
            icon: "cloud",
            effect: Effect::Clouds,
        }
    } else {
        Classification {
            icon: FALLBACK_ICON,
            effect: Effect::None,
        }
    }
}

/// Convenience accessor for just the icon id
pub fn icon_for(condition: &str) -> &'static str {
    classify(condition).icon
}
