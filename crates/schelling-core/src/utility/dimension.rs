//! Weighted per-dimension composite

use serde::{Deserialize, Serialize};

use super::criteria::Criterion;
use super::{ScoreRange, UtilityContext, UtilityModel};
use crate::components::{TypeValue, TypeVector};
use crate::error::UtilityError;

/// How a composite turns its weighted sum into a score once a satisfaction
/// threshold is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// 1 when the sum reaches the threshold, 0 otherwise
    #[default]
    PassFail,
    /// `min(sum / threshold, 1)`. A threshold of zero or below cannot be
    /// divided by, so it scores like `PassFail`.
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Satisfaction {
    pub threshold: f64,
    pub mode: ThresholdMode,
}

impl Satisfaction {
    fn apply(&self, sum: f64) -> f64 {
        match self.mode {
            ThresholdMode::Continuous if self.threshold > 0.0 => (sum / self.threshold).min(1.0),
            _ => {
                if sum >= self.threshold {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    fn range(&self, sum: ScoreRange) -> ScoreRange {
        match self.mode {
            ThresholdMode::Continuous if self.threshold > 0.0 => {
                ScoreRange::new((sum.lo / self.threshold).min(1.0), 1.0)
            }
            _ => ScoreRange::new(0.0, 1.0),
        }
    }
}

struct Term {
    index: usize,
    weight: f64,
    criterion: Box<dyn Criterion>,
}

/// Sum of weighted per-dimension criteria.
///
/// Each term reads one dimension of the agent's type vector and the same
/// dimension of every neighbor's.
#[derive(Default)]
pub struct DimensionWise {
    terms: Vec<Term>,
    satisfaction: Option<Satisfaction>,
}

impl DimensionWise {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_term(mut self, index: usize, weight: f64, criterion: impl Criterion + 'static) -> Self {
        self.terms.push(Term {
            index,
            weight,
            criterion: Box::new(criterion),
        });
        self
    }

    pub fn with_boxed_term(mut self, index: usize, weight: f64, criterion: Box<dyn Criterion>) -> Self {
        self.terms.push(Term {
            index,
            weight,
            criterion,
        });
        self
    }

    /// Replaces the weighted sum by a satisfaction score against `threshold`.
    ///
    /// `Continuous` with a non-positive threshold falls back to pass/fail.
    pub fn with_satisfaction(mut self, threshold: f64, mode: ThresholdMode) -> Self {
        self.satisfaction = Some(Satisfaction { threshold, mode });
        self
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    fn weighted_sum(&self, agent: &TypeVector, neighbors: &[&TypeVector]) -> Result<f64, UtilityError> {
        let mut sum = 0.0;
        for term in &self.terms {
            let own = agent
                .get(term.index)
                .ok_or(UtilityError::DimensionMismatch { index: term.index })?;
            let others = neighbors
                .iter()
                .map(|v| v.get(term.index))
                .collect::<Option<Vec<&TypeValue>>>()
                .ok_or(UtilityError::DimensionMismatch { index: term.index })?;
            sum += term.weight * term.criterion.evaluate(own, &others)?;
        }
        Ok(sum)
    }
}

impl UtilityModel for DimensionWise {
    fn score(
        &self,
        agent: &TypeVector,
        neighbors: &[&TypeVector],
        _context: &UtilityContext<'_>,
    ) -> Result<f64, UtilityError> {
        let sum = self.weighted_sum(agent, neighbors)?;
        Ok(match &self.satisfaction {
            Some(satisfaction) => satisfaction.apply(sum),
            None => sum,
        })
    }

    fn range(&self) -> ScoreRange {
        let sum = self.terms.iter().fold(ScoreRange::new(0.0, 0.0), |acc, term| {
            acc.plus(term.criterion.range().scaled(term.weight))
        });
        match &self.satisfaction {
            Some(satisfaction) => satisfaction.range(sum),
            None => sum,
        }
    }
}
