//! Prompt augmentation: a directive grafted onto the user's turn before the
//! first model call of a run.

pub mod heuristic;

pub use heuristic::{Enhancement, HeuristicAugmenter, ProblemType, QualityRequirement};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Message;
use crate::util::timeout::with_timeout;

const FALLBACK_DIRECTIVE: &str = "FALLBACK DIRECTIVES:
- Apply systematic organization to your response
- Provide clear, actionable recommendations
- Include appropriate error handling where applicable
- Validate response quality before delivery";

/// Input handed to an augmenter.
#[derive(Debug, Clone)]
pub struct AugmentRequest {
    pub session_id: String,
    /// Text of the new user turn.
    pub content: String,
    /// Transcript the model will see, ending with the new user turn.
    pub history: Vec<Message>,
}

/// How the heuristic classified a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationMetadata {
    pub problem_type: ProblemType,
    pub complexity: u8,
    pub tool_intensity: u8,
    pub quality: QualityRequirement,
    pub enhancement: Enhancement,
}

/// Directive produced for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Augmentation {
    pub directive: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AugmentationMetadata>,
    /// Set when the directive is the deterministic fallback.
    #[serde(default)]
    pub fallback: bool,
}

impl Augmentation {
    pub fn new(directive: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            metadata: None,
            fallback: false,
        }
    }

    /// Fixed directive used when augmentation fails or runs out of time.
    pub fn fallback() -> Self {
        Self {
            directive: FALLBACK_DIRECTIVE.to_string(),
            metadata: None,
            fallback: true,
        }
    }

    /// Enhancement chosen by the classifier, if one ran.
    pub fn enhancement(&self) -> Option<Enhancement> {
        self.metadata.map(|m| m.enhancement)
    }
}

/// Strategy producing the directive for a request.
#[async_trait]
pub trait PromptAugmenter: Send + Sync {
    async fn augment(&self, request: AugmentRequest) -> Result<Augmentation>;
}

/// Run an augmenter under its own time budget. Never fails: errors and
/// timeouts turn into [`Augmentation::fallback`].
pub async fn augment_within(
    augmenter: &dyn PromptAugmenter,
    request: AugmentRequest,
    budget: Duration,
) -> Augmentation {
    let session_id = request.session_id.clone();
    let started = Instant::now();
    let augmentation = match with_timeout(budget, augmenter.augment(request)).await {
        Ok(augmentation) => augmentation,
        Err(err) => {
            tracing::warn!(session_id = %session_id, error = %err, "prompt augmentation failed, using fallback");
            Augmentation::fallback()
        }
    };
    tracing::info!(
        session_id = %session_id,
        elapsed_ms = started.elapsed().as_millis() as u64,
        enhancement = ?augmentation.enhancement(),
        fallback = augmentation.fallback,
        "prompt augmented"
    );
    augmentation
}
