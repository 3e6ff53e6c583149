//! Hand-picked keyword rows used to populate an empty keyword table before the
//! first real pageview cycle. Nothing here is ever mixed into a live cycle;
//! callers write it explicitly through [`seed_keywords`].

use chrono::{DateTime, Utc};

use crate::models::{EntityDetails, TrackedEntity, Trend};

/// Stored as the `topic_title` of every seeded row so it cannot be mistaken
/// for a collected one.
pub const SYNTHETIC_LABEL: &str = "synthetic-seed";

pub struct SeedKeyword {
    pub keyword: &'static str,
    pub score: u64,
    pub change_pct: i64,
    pub trend: Trend,
}

const fn seed(keyword: &'static str, score: u64, change_pct: i64, trend: Trend) -> SeedKeyword {
    SeedKeyword {
        keyword,
        score,
        change_pct,
        trend,
    }
}

pub const SEED_KEYWORDS: [SeedKeyword; 20] = [
    seed("DeepSeek R1", 97, 890, Trend::Rising),
    seed("DeepSeek V3", 91, 620, Trend::Rising),
    seed("Grok 3", 88, 440, Trend::Rising),
    seed("Claude 3.7", 85, 310, Trend::Rising),
    seed("Gemini 2.0", 82, 260, Trend::Rising),
    seed("GPT o3", 79, 185, Trend::Rising),
    seed("Phi-4", 74, 142, Trend::Rising),
    seed("Qwen 2.5", 71, 118, Trend::Rising),
    seed("Llama 3.3", 68, 96, Trend::Rising),
    seed("AI Agent", 86, 230, Trend::Rising),
    seed("Cursor AI", 76, 198, Trend::Rising),
    seed("Sora", 65, 88, Trend::Rising),
    seed("GPT-4", 58, -32, Trend::Falling),
    seed("Stable Diffusion", 48, -28, Trend::Falling),
    seed("DALL-E 3", 44, -24, Trend::Falling),
    seed("Bard", 20, -71, Trend::Falling),
    seed("GPT-3", 30, -55, Trend::Falling),
    seed("ChatGPT", 92, 4, Trend::Stable),
    seed("Midjourney", 62, -3, Trend::Stable),
    seed("Whisper", 55, 2, Trend::Stable),
];

/// Estimated prior score: `round(score * (1 - change_pct / 500))`, floored at 0.
pub fn estimated_score_prev(score: u64, change_pct: i64) -> u64 {
    let estimate = (score as f64 * (1.0 - change_pct as f64 / 100.0 / 5.0)).round();
    if estimate <= 0.0 {
        0
    } else {
        estimate as u64
    }
}

pub fn seed_keywords(now: DateTime<Utc>) -> Vec<TrackedEntity> {
    let week_start = now.format("%Y-%m-%d").to_string();
    SEED_KEYWORDS
        .iter()
        .map(|seed| {
            let score_prev = estimated_score_prev(seed.score, seed.change_pct);
            TrackedEntity {
                identifier: seed.keyword.to_string(),
                primary_metric: seed.score,
                previous_metric: score_prev,
                has_history: true,
                change_pct: seed.change_pct,
                trend: seed.trend,
                category: None,
                rank: None,
                collected_at: now,
                details: EntityDetails::Keyword {
                    topic_title: SYNTHETIC_LABEL.to_string(),
                    score_prev,
                    views_recent: 0,
                    views_prev: 0,
                    week_start: week_start.clone(),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_estimate_is_floored_at_zero() {
        assert_eq!(estimated_score_prev(97, 890), 0);
        assert_eq!(estimated_score_prev(58, -32), 62);
        assert_eq!(estimated_score_prev(92, 4), 91);
    }

    #[test]
    fn seeded_rows_are_labeled() {
        let rows = seed_keywords(Utc::now());
        assert_eq!(rows.len(), 20);
        assert!(rows.iter().all(|row| matches!(
            &row.details,
            EntityDetails::Keyword { topic_title, .. } if topic_title == SYNTHETIC_LABEL
        )));
        let rising = rows.iter().filter(|row| row.trend == Trend::Rising).count();
        assert_eq!(rising, 12);
    }
}
