//! Session-level token and timing counters.

use serde::{Deserialize, Serialize};

/// Accumulated statistics for one agent session.
///
/// Counters grow monotonically across iterations; subagent totals are a
/// subset of the overall totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Prompt tokens processed.
    pub input_tokens: u64,
    /// Tokens generated.
    pub output_tokens: u64,
    /// Tokens served from the prompt cache.
    pub cached_tokens: u64,
    /// Total prompt evaluation time in milliseconds.
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub prompt_ms: f64,
    /// Total generation time in milliseconds.
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub predicted_ms: f64,
    /// Prompt tokens contributed by subagent runs.
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub subagent_input_tokens: u64,
    /// Output tokens contributed by subagent runs.
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub subagent_output_tokens: u64,
    /// Cached tokens contributed by subagent runs.
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub subagent_cached_tokens: u64,
    /// Number of subagent runs.
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub subagent_count: u64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

impl SessionStats {
    /// Fold another stats block into this one (used when a subagent
    /// completes).
    pub fn absorb_subagent(&mut self, input: u64, output: u64, cached: u64) {
        self.input_tokens += input;
        self.output_tokens += output;
        self.cached_tokens += cached;
        self.subagent_input_tokens += input;
        self.subagent_output_tokens += output;
        self.subagent_cached_tokens += cached;
        self.subagent_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zeroed() {
        let s = SessionStats::default();
        assert_eq!(s.input_tokens, 0);
        assert_eq!(s.output_tokens, 0);
        assert_eq!(s.cached_tokens, 0);
    }

    #[test]
    fn absorb_subagent_updates_both_sets() {
        let mut s = SessionStats {
            input_tokens: 100,
            ..Default::default()
        };
        s.absorb_subagent(10, 20, 5);
        assert_eq!(s.input_tokens, 110);
        assert_eq!(s.output_tokens, 20);
        assert_eq!(s.subagent_input_tokens, 10);
        assert_eq!(s.subagent_count, 1);
    }

    #[test]
    fn zero_optional_fields_omitted_on_wire() {
        let s = SessionStats {
            input_tokens: 5,
            output_tokens: 7,
            cached_tokens: 0,
            ..Default::default()
        };
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["input_tokens"], 5);
        assert!(json.get("prompt_ms").is_none());
        assert!(json.get("subagent_count").is_none());
    }
}
