use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::embed::EmbeddingProvider;
use crate::resolver::{Outcome, Resolution, Resolver};

pub const DEFAULT_REQUIRED_PASS_RATE: f32 = 0.85;

/// One regression case: an utterance and the path it is expected to take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    pub case_id: String,
    pub input: String,
    pub expected_outcome: Outcome,
    /// For FAQ expectations, the required positional index. Ignored for
    /// small-talk and fallback cases.
    #[serde(default)]
    pub expected_position: Option<usize>,
    #[serde(default)]
    pub min_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalOutcome {
    pub case_id: String,
    pub passed: bool,
    pub actual_outcome: Outcome,
    pub actual_position: Option<usize>,
    pub reply: String,
    pub score: Option<f32>,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f32,
    pub outcomes: Vec<EvalOutcome>,
}

fn case_passes(case: &EvalCase, resolution: &Resolution) -> bool {
    if case.expected_outcome != resolution.outcome {
        return false;
    }
    if let Some(expected) = case.expected_position {
        if resolution.position != Some(expected) {
            return false;
        }
    }
    if let Some(min) = case.min_score {
        if resolution.score.map_or(true, |s| s < min) {
            return false;
        }
    }
    true
}

pub fn evaluate_cases<E: EmbeddingProvider>(
    resolver: &Resolver<E>,
    cases: &[EvalCase],
) -> anyhow::Result<EvalSummary> {
    let mut outcomes = Vec::with_capacity(cases.len());

    for case in cases {
        let start = Instant::now();
        let resolution = resolver.resolve_detailed(&case.input)?;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let passed = case_passes(case, &resolution);

        outcomes.push(EvalOutcome {
            case_id: case.case_id.clone(),
            passed,
            actual_outcome: resolution.outcome,
            actual_position: resolution.position,
            reply: resolution.reply,
            score: resolution.score,
            latency_ms,
        });
    }

    let total = outcomes.len();
    let passed = outcomes.iter().filter(|o| o.passed).count();
    let failed = total.saturating_sub(passed);
    let pass_rate = if total == 0 {
        0.0
    } else {
        passed as f32 / total as f32
    };

    Ok(EvalSummary {
        total,
        passed,
        failed,
        pass_rate,
        outcomes,
    })
}
