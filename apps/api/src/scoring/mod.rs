//! A-T-Q composite: Accomplishments, Trajectory, Qualifications.
//!
//! The weights are a fixed data contract shared with the scoring service and with
//! every stored evaluation. Changing them invalidates historical scores.

pub mod pricing;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AtqWeights {
    pub accomplishments: f64,
    pub trajectory: f64,
    pub qualifications: f64,
}

pub const ATQ_WEIGHTS: AtqWeights = AtqWeights {
    accomplishments: 0.5,
    trajectory: 0.3,
    qualifications: 0.2,
};

/// The three component scores of an ATQ evaluation, each 0–100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtqComponents {
    pub a: f64,
    pub t: f64,
    pub q: f64,
}

impl AtqComponents {
    pub fn new(a: f64, t: f64, q: f64) -> Result<Self, String> {
        for (name, value) in [("a_score", a), ("t_score", t), ("q_score", q)] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(format!("{name} must be between 0 and 100, got {value}"));
            }
        }
        Ok(Self { a, t, q })
    }

    /// score = 0.5*a + 0.3*t + 0.2*q
    pub fn composite(&self) -> f64 {
        compute_atq_score(self.a, self.t, self.q, &ATQ_WEIGHTS)
    }
}

/// Weighted ATQ composite, clamped to 0–100.
pub fn compute_atq_score(a: f64, t: f64, q: f64, weights: &AtqWeights) -> f64 {
    (weights.accomplishments * a + weights.trajectory * t + weights.qualifications * q)
        .clamp(0.0, 100.0)
}

/// Validates an overall score supplied directly (quick scores, legacy QER).
pub fn check_overall_score(score: f64) -> Result<f64, String> {
    if score.is_finite() && (0.0..=100.0).contains(&score) {
        Ok(score)
    } else {
        Err(format!("score must be between 0 and 100, got {score}"))
    }
}
