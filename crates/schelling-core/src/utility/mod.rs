//! Utility Models
//!
//! A utility model maps an agent's type vector and the type vectors of its
//! neighbors to a satisfaction score. The capability is open: built-in
//! models live in the submodules, and callers can plug in their own
//! implementation or wrap a closure with [`utility_fn`].
//!
//! - [`criteria`]: per-dimension building blocks (count, ratio, per-label)
//! - [`dimension`]: weighted per-dimension composite with optional threshold
//! - [`social`]: friends/enemies term over a social graph

pub mod criteria;
pub mod dimension;
pub mod social;

pub use criteria::{Bounds, Count, Criterion, PerLabel, Ratio, Similarity};
pub use dimension::{DimensionWise, Satisfaction, ThresholdMode};
pub use social::{SocialAffinity, SocialGraph, SocialMode};

use std::any::Any;
use std::sync::Arc;

use crate::components::{Metric, PlacementView, TypeDimension, TypeSpace, TypeVector};
use crate::error::UtilityError;
use schelling_events::{AgentId, NodeId};

/// Score returned when a bounded criterion falls outside its bounds
pub const BAD_UTILITY: f64 = -1.0;

/// Neighborhood radius of the default continuous criterion, as a share of
/// the interval width
pub const DEFAULT_CONTINUOUS_RADIUS: f64 = 0.1;

/// Extra information passed to every utility evaluation.
///
/// `neighbors` and `topology` both describe the placement being evaluated,
/// which for a candidate move is the placement the move would produce.
#[derive(Clone, Copy)]
pub struct UtilityContext<'a> {
    pub agent: AgentId,
    pub node: NodeId,
    pub neighbors: &'a [AgentId],
    pub topology: PlacementView<'a>,
    /// Caller-supplied auxiliary data, passed through uninterpreted
    pub data: Option<&'a (dyn Any + Send + Sync)>,
}

impl<'a> UtilityContext<'a> {
    /// Downcasts the auxiliary data.
    pub fn data<T: Any>(&self) -> Option<&'a T> {
        self.data.and_then(|d| d.downcast_ref::<T>())
    }
}

/// Closed interval of scores a model can produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub lo: f64,
    pub hi: f64,
}

impl ScoreRange {
    pub const UNBOUNDED: ScoreRange = ScoreRange {
        lo: f64::NEG_INFINITY,
        hi: f64::INFINITY,
    };

    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }

    /// Range of `weight * x` for x in this range
    pub fn scaled(self, weight: f64) -> Self {
        if weight == 0.0 {
            return Self::new(0.0, 0.0);
        }
        let (a, b) = (self.lo * weight, self.hi * weight);
        Self::new(a.min(b), a.max(b))
    }

    /// Range of `x + y`
    pub fn plus(self, other: ScoreRange) -> Self {
        Self::new(self.lo + other.lo, self.hi + other.hi)
    }

    pub fn union(self, other: ScoreRange) -> Self {
        Self::new(self.lo.min(other.lo), self.hi.max(other.hi))
    }
}

/// Scores an agent's neighborhood.
///
/// Implementations must be pure: the same inputs always give the same
/// score. Randomness belongs to agents and the move engine.
pub trait UtilityModel: Send + Sync {
    fn score(
        &self,
        agent: &TypeVector,
        neighbors: &[&TypeVector],
        context: &UtilityContext<'_>,
    ) -> Result<f64, UtilityError>;

    /// Scores this model can produce; used to validate happiness thresholds.
    fn range(&self) -> ScoreRange {
        ScoreRange::UNBOUNDED
    }
}

impl<T: UtilityModel + ?Sized> UtilityModel for Box<T> {
    fn score(
        &self,
        agent: &TypeVector,
        neighbors: &[&TypeVector],
        context: &UtilityContext<'_>,
    ) -> Result<f64, UtilityError> {
        (**self).score(agent, neighbors, context)
    }

    fn range(&self) -> ScoreRange {
        (**self).range()
    }
}

impl<T: UtilityModel + ?Sized> UtilityModel for Arc<T> {
    fn score(
        &self,
        agent: &TypeVector,
        neighbors: &[&TypeVector],
        context: &UtilityContext<'_>,
    ) -> Result<f64, UtilityError> {
        (**self).score(agent, neighbors, context)
    }

    fn range(&self) -> ScoreRange {
        (**self).range()
    }
}

/// A closure adapted to [`UtilityModel`].
pub struct UtilityFn<F> {
    f: F,
    range: ScoreRange,
}

/// Wraps a closure as a utility model.
pub fn utility_fn<F>(f: F) -> UtilityFn<F>
where
    F: Fn(&TypeVector, &[&TypeVector], &UtilityContext<'_>) -> Result<f64, UtilityError> + Send + Sync,
{
    UtilityFn {
        f,
        range: ScoreRange::UNBOUNDED,
    }
}

impl<F> UtilityFn<F> {
    /// Declares the scores the closure can produce.
    pub fn with_range(mut self, lo: f64, hi: f64) -> Self {
        self.range = ScoreRange::new(lo, hi);
        self
    }
}

impl<F> UtilityModel for UtilityFn<F>
where
    F: Fn(&TypeVector, &[&TypeVector], &UtilityContext<'_>) -> Result<f64, UtilityError> + Send + Sync,
{
    fn score(
        &self,
        agent: &TypeVector,
        neighbors: &[&TypeVector],
        context: &UtilityContext<'_>,
    ) -> Result<f64, UtilityError> {
        (self.f)(agent, neighbors, context)
    }

    fn range(&self) -> ScoreRange {
        self.range
    }
}

/// Weighted sum of utility models, e.g. a type term plus a social term.
#[derive(Default)]
pub struct Blend {
    terms: Vec<(f64, Box<dyn UtilityModel>)>,
}

impl Blend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, weight: f64, model: impl UtilityModel + 'static) -> Self {
        self.terms.push((weight, Box::new(model)));
        self
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl UtilityModel for Blend {
    fn score(
        &self,
        agent: &TypeVector,
        neighbors: &[&TypeVector],
        context: &UtilityContext<'_>,
    ) -> Result<f64, UtilityError> {
        let mut total = 0.0;
        for (weight, model) in &self.terms {
            total += weight * model.score(agent, neighbors, context)?;
        }
        Ok(total)
    }

    fn range(&self) -> ScoreRange {
        self.terms
            .iter()
            .fold(ScoreRange::new(0.0, 0.0), |acc, (weight, model)| {
                acc.plus(model.range().scaled(*weight))
            })
    }
}

/// Default model for a type space: same-neighbor ratio per dimension,
/// summed with weight 1.
///
/// Categorical dimensions match on label equality; continuous dimensions
/// count neighbors within [`DEFAULT_CONTINUOUS_RADIUS`] of the interval width.
pub fn default_for(space: &TypeSpace) -> DimensionWise {
    space
        .dimensions()
        .iter()
        .enumerate()
        .fold(DimensionWise::new(), |model, (index, dimension)| {
            let similarity = match dimension {
                TypeDimension::Categorical { .. } => Similarity::Exact,
                TypeDimension::Continuous { lo, hi, .. } => Similarity::Within {
                    max_distance: (hi - lo) * DEFAULT_CONTINUOUS_RADIUS,
                    metric: Metric::Absolute,
                },
            };
            model.with_term(index, 1.0, Ratio::new(similarity))
        })
}
