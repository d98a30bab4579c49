//! Keyword heuristic: classify the request, score complexity and tool
//! intensity, pick an enhancement level, and render a directive.

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{AugmentRequest, Augmentation, AugmentationMetadata, PromptAugmenter};
use crate::error::Result;

/// Kind of problem a request describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProblemType {
    TechnicalIssue,
    ProcessImprovement,
    DecisionMaking,
    Troubleshooting,
    CodeGeneration,
    Analysis,
    General,
}

/// Reasoning scaffold requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Enhancement {
    Standard,
    Reflexion,
    React,
    ToolOptimization,
    MetaPrompting,
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QualityRequirement {
    Standard,
    High,
}

/// Complexity cut-offs for enhancement selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityThresholds {
    pub standard_max: u8,
    pub reflexion_min: u8,
    pub reflexion_max: u8,
    pub react_min: u8,
    pub react_max: u8,
    pub meta_prompting_min: u8,
    pub combined_min: u8,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            standard_max: 3,
            reflexion_min: 4,
            reflexion_max: 6,
            react_min: 6,
            react_max: 8,
            meta_prompting_min: 7,
            combined_min: 8,
        }
    }
}

const PROBLEM_KEYWORDS: &[(ProblemType, &[&str])] = &[
    (
        ProblemType::TechnicalIssue,
        &[
            "bug", "error", "exception", "crash", "fail", "broken", "issue", "problem",
            "not working", "doesn't work", "won't run", "can't execute",
        ],
    ),
    (
        ProblemType::ProcessImprovement,
        &[
            "optimize", "improve", "enhance", "better", "faster", "efficient", "performance",
            "refactor", "clean up", "streamline", "upgrade",
        ],
    ),
    (
        ProblemType::DecisionMaking,
        &[
            "choose", "decide", "select", "option", "alternative", "which", "should i",
            "recommend", "suggest", "best", "compare",
        ],
    ),
    (
        ProblemType::Troubleshooting,
        &[
            "debug", "diagnose", "investigate", "find", "locate", "identify", "trace", "why",
            "how", "what's wrong", "what happened",
        ],
    ),
    (
        ProblemType::CodeGeneration,
        &[
            "create", "generate", "write", "build", "implement", "develop", "code", "function",
            "class", "method", "script", "program",
        ],
    ),
    (
        ProblemType::Analysis,
        &[
            "analyze", "examine", "review", "assess", "evaluate", "study", "understand",
            "explain", "describe", "what does", "how does",
        ],
    ),
];

const COMPLEXITY_KEYWORDS: &[&str] = &[
    "architecture", "system", "design", "integrate", "complex", "multiple", "analyze",
    "optimize", "refactor", "debug", "troubleshoot", "implement", "comprehensive", "detailed",
    "advanced", "sophisticated",
];

const TOOL_KEYWORDS: &[&str] = &[
    "file", "code", "edit", "create", "modify", "run", "execute", "test", "build", "compile",
    "deploy", "install", "configure", "setup",
];

const HIGH_QUALITY_KEYWORDS: &[&str] = &[
    "production", "critical", "important", "careful", "precise", "accurate", "comprehensive",
    "detailed", "thorough", "professional",
];

const MULTI_STEP_KEYWORDS: &[&str] = &["and", "then"];

/// Distinct keywords of a list matched as whole words.
struct KeywordSet {
    pattern: Option<Regex>,
}

impl KeywordSet {
    fn new(words: &[&str]) -> Self {
        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = match Regex::new(&format!(r"(?i)\b(?:{alternation})\b")) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!(error = %err, "invalid keyword pattern, ignoring set");
                None
            }
        };
        Self { pattern }
    }

    fn count(&self, text: &str) -> usize {
        let Some(ref re) = self.pattern else {
            return 0;
        };
        re.find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Default [`PromptAugmenter`]: deterministic and local, no backend calls.
pub struct HeuristicAugmenter {
    thresholds: ComplexityThresholds,
    problems: Vec<(ProblemType, KeywordSet)>,
    complexity: KeywordSet,
    tools: KeywordSet,
    quality: KeywordSet,
    multi_step: KeywordSet,
}

impl Default for HeuristicAugmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HeuristicAugmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeuristicAugmenter")
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

impl HeuristicAugmenter {
    pub fn new() -> Self {
        Self::with_thresholds(ComplexityThresholds::default())
    }

    pub fn with_thresholds(thresholds: ComplexityThresholds) -> Self {
        Self {
            thresholds,
            problems: PROBLEM_KEYWORDS
                .iter()
                .map(|(kind, words)| (*kind, KeywordSet::new(words)))
                .collect(),
            complexity: KeywordSet::new(COMPLEXITY_KEYWORDS),
            tools: KeywordSet::new(TOOL_KEYWORDS),
            quality: KeywordSet::new(HIGH_QUALITY_KEYWORDS),
            multi_step: KeywordSet::new(MULTI_STEP_KEYWORDS),
        }
    }

    /// Highest-scoring problem type; ties go to the earlier type.
    pub fn classify(&self, content: &str) -> ProblemType {
        let mut best = (ProblemType::General, 0);
        for (kind, words) in &self.problems {
            let score = words.count(content);
            if score > best.1 {
                best = (*kind, score);
            }
        }
        best.0
    }

    /// Complexity on a 1–10 scale.
    pub fn complexity(&self, content: &str) -> u8 {
        let mut score = 1usize;
        if content.len() > 500 {
            score += 2;
        } else if content.len() > 200 {
            score += 1;
        }
        score += self.complexity.count(content);
        if self.multi_step.count(content) > 0 {
            score += 1;
        }
        score.min(10) as u8
    }

    /// Tool intensity on a 0–5 scale.
    pub fn tool_intensity(&self, content: &str) -> u8 {
        self.tools.count(content).min(5) as u8
    }

    pub fn quality(&self, content: &str) -> QualityRequirement {
        if self.quality.count(content) > 0 {
            QualityRequirement::High
        } else {
            QualityRequirement::Standard
        }
    }

    pub fn select(&self, complexity: u8, tool_intensity: u8) -> Enhancement {
        let t = &self.thresholds;
        if complexity <= t.standard_max && tool_intensity <= 1 {
            Enhancement::Standard
        } else if complexity >= t.combined_min {
            Enhancement::Combined
        } else if complexity >= t.meta_prompting_min {
            Enhancement::MetaPrompting
        } else if (t.react_min..=t.react_max).contains(&complexity) {
            Enhancement::React
        } else if tool_intensity >= 3 {
            Enhancement::ToolOptimization
        } else if (t.reflexion_min..=t.reflexion_max).contains(&complexity) {
            Enhancement::Reflexion
        } else {
            Enhancement::Standard
        }
    }

    /// Full analysis of one request.
    pub fn analyze(&self, content: &str) -> AugmentationMetadata {
        let complexity = self.complexity(content);
        let tool_intensity = self.tool_intensity(content);
        AugmentationMetadata {
            problem_type: self.classify(content),
            complexity,
            tool_intensity,
            quality: self.quality(content),
            enhancement: self.select(complexity, tool_intensity),
        }
    }

    pub fn render(&self, meta: &AugmentationMetadata) -> String {
        let checklist_level = match meta.quality {
            QualityRequirement::High => meta.complexity.max(4),
            QualityRequirement::Standard => meta.complexity,
        };
        format!(
            "REQUEST PROFILE: {} | complexity {}/10 | tool intensity {}/5 | {}\n\nENHANCEMENT: {}\n\n{}\n\n{}",
            meta.problem_type,
            meta.complexity,
            meta.tool_intensity,
            meta.enhancement,
            enhancement_guidance(meta.enhancement),
            pattern_template(meta.problem_type),
            quality_checklist(checklist_level),
        )
    }
}

#[async_trait]
impl PromptAugmenter for HeuristicAugmenter {
    async fn augment(&self, request: AugmentRequest) -> Result<Augmentation> {
        let meta = self.analyze(&request.content);
        tracing::debug!(
            session_id = %request.session_id,
            problem_type = %meta.problem_type,
            complexity = meta.complexity,
            tool_intensity = meta.tool_intensity,
            enhancement = %meta.enhancement,
            "request classified"
        );
        Ok(Augmentation {
            directive: self.render(&meta),
            metadata: Some(meta),
            fallback: false,
        })
    }
}

fn enhancement_guidance(enhancement: Enhancement) -> &'static str {
    match enhancement {
        Enhancement::Standard => "Answer directly and keep the response focused.",
        Enhancement::Reflexion => {
            "Draft a response, evaluate it for correctness, edge cases and clarity, then deliver the improved version."
        }
        Enhancement::React => {
            "Work step by step: reason about the next step, act (use tools where needed), observe the result, and adapt."
        }
        Enhancement::ToolOptimization => {
            "Choose the most appropriate tools, batch similar operations, and sequence tool use to avoid redundant calls."
        }
        Enhancement::MetaPrompting => {
            "Adapt the reasoning approach to the problem domain and its constraints before solving."
        }
        Enhancement::Combined => {
            "Decompose the problem, reason step by step with tools, then review and refine the result before delivery."
        }
    }
}

fn pattern_template(problem: ProblemType) -> &'static str {
    match problem {
        ProblemType::TechnicalIssue => {
            "TECHNICAL ISSUE TEMPLATE:
1. Problem Diagnosis (identify symptoms and scope)
2. Root Cause Analysis (systematic investigation)
3. Solution Design (comprehensive approach)
4. Implementation Plan (step-by-step execution)
5. Testing Strategy (validation and verification)"
        }
        ProblemType::CodeGeneration => {
            "CODE GENERATION TEMPLATE:
1. Requirements Analysis (understand specifications)
2. Design (plan structure and patterns)
3. Implementation (write clean, maintainable code)
4. Validation (test functionality and edge cases)
5. Documentation (comments, examples, usage)"
        }
        ProblemType::ProcessImprovement => {
            "PROCESS IMPROVEMENT TEMPLATE:
1. Current State Assessment
2. Gap Analysis
3. Recommendations
4. Implementation Plan
5. Success Metrics"
        }
        ProblemType::Troubleshooting => {
            "TROUBLESHOOTING TEMPLATE:
1. Symptom Analysis
2. Hypothesis Formation
3. Testing Approach
4. Solution Implementation
5. Prevention Strategy"
        }
        ProblemType::DecisionMaking => {
            "DECISION TEMPLATE:
1. Context
2. Options
3. Trade-offs
4. Recommendation
5. Implementation"
        }
        ProblemType::Analysis | ProblemType::General => {
            "GENERAL TEMPLATE:
1. Problem Understanding (clarify requirements)
2. Analysis (break down complexity)
3. Solution Design
4. Implementation (step-by-step execution)
5. Validation (verify results and quality)"
        }
    }
}

fn quality_checklist(level: u8) -> String {
    let mut checklist = String::from(
        "QUALITY CHECKLIST:
- Problem understanding is demonstrated
- The approach is explained
- Recommendations are specific and actionable
- Risks and limitations are acknowledged",
    );
    if level >= 7 {
        checklist.push_str(
            "
- Error handling and edge cases are covered
- Performance implications are considered
- Security implications are addressed
- Maintainability is considered",
        );
    } else if level >= 4 {
        checklist.push_str(
            "
- Common error cases are handled
- Basic performance considerations are included",
        );
    }
    checklist
}
