//! Token usage and cost tracking types.

use serde::{Deserialize, Serialize};

/// Token counters reported by a backend for one completed stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_tokens: u64,
    #[serde(default)]
    pub cache_read_tokens: u64,
}

impl TokenUsage {
    /// Tokens billed on the prompt side: fresh input plus cache writes.
    pub fn prompt_tokens(&self) -> u64 {
        self.input_tokens + self.cache_creation_tokens
    }

    /// Tokens billed on the completion side: output plus cache reads.
    pub fn completion_tokens(&self) -> u64 {
        self.output_tokens + self.cache_read_tokens
    }
}

/// Per-model prices in USD per one million tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelPricing {
    pub input_per_m: f64,
    pub output_per_m: f64,
    #[serde(default)]
    pub cache_write_per_m: f64,
    #[serde(default)]
    pub cache_read_per_m: f64,
}

impl ModelPricing {
    pub const fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
            cache_write_per_m: 0.0,
            cache_read_per_m: 0.0,
        }
    }

    pub const fn with_cache(mut self, cache_write_per_m: f64, cache_read_per_m: f64) -> Self {
        self.cache_write_per_m = cache_write_per_m;
        self.cache_read_per_m = cache_read_per_m;
        self
    }

    /// Dollar cost of `usage` at these prices.
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        self.cache_write_per_m / 1e6 * usage.cache_creation_tokens as f64
            + self.cache_read_per_m / 1e6 * usage.cache_read_tokens as f64
            + self.input_per_m / 1e6 * usage.input_tokens as f64
            + self.output_per_m / 1e6 * usage.output_tokens as f64
    }
}
