//! Probability-only display rating shown to loan officers.
//!
//! This is a separate policy from the underwriting bands in [`super::composer`]: it looks at
//! the model probability alone and buckets it five ways. The two are not interchangeable.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskCategory {
    pub const fn label(self) -> &'static str {
        match self {
            RiskCategory::VeryLow => "Very Low Risk",
            RiskCategory::Low => "Low Risk",
            RiskCategory::Moderate => "Moderate Risk",
            RiskCategory::High => "High Risk",
            RiskCategory::VeryHigh => "Very High Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRating {
    /// `floor(probability * 100)`.
    pub rating: u8,
    pub category: RiskCategory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskRatingPolicy {
    cut_points: [u8; 4],
}

impl Default for RiskRatingPolicy {
    fn default() -> Self {
        Self {
            cut_points: [20, 40, 60, 80],
        }
    }
}

impl RiskRatingPolicy {
    pub fn rate(&self, probability: f64) -> RiskRating {
        let rating = (probability.clamp(0.0, 1.0) * 100.0).floor() as u8;
        let [very_low, low, moderate, high] = self.cut_points;

        let category = if rating < very_low {
            RiskCategory::VeryLow
        } else if rating < low {
            RiskCategory::Low
        } else if rating < moderate {
            RiskCategory::Moderate
        } else if rating < high {
            RiskCategory::High
        } else {
            RiskCategory::VeryHigh
        };

        RiskRating { rating, category }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_probability_five_ways() {
        let policy = RiskRatingPolicy::default();
        let cases = [
            (0.0, 0, RiskCategory::VeryLow),
            (0.199, 19, RiskCategory::VeryLow),
            (0.2, 20, RiskCategory::Low),
            (0.45, 45, RiskCategory::Moderate),
            (0.61, 61, RiskCategory::High),
            (0.8, 80, RiskCategory::VeryHigh),
            (1.0, 100, RiskCategory::VeryHigh),
        ];

        for (probability, rating, category) in cases {
            assert_eq!(
                policy.rate(probability),
                RiskRating { rating, category },
                "probability {probability}"
            );
        }
    }

    #[test]
    fn labels_match_officer_dashboard() {
        assert_eq!(RiskCategory::Moderate.label(), "Moderate Risk");
        assert_eq!(RiskCategory::VeryHigh.label(), "Very High Risk");
    }
}
