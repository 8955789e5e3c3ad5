//! Per-dimension criteria
//!
//! A criterion scores one type dimension: it sees the agent's own value and
//! the neighbors' values along that dimension. [`DimensionWise`] combines
//! criteria across dimensions.
//!
//! [`DimensionWise`]: super::DimensionWise

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{ScoreRange, BAD_UTILITY};
use crate::components::{Metric, TypeValue};
use crate::error::UtilityError;

/// How alike two values along one dimension are, in [0, 1].
#[derive(Clone, Default)]
pub enum Similarity {
    /// Equal labels or equal scalars
    #[default]
    Exact,
    /// Scalars at most `max_distance` apart under `metric`
    Within { max_distance: f64, metric: Metric },
    /// `1 - |a - b| / span`, floored at zero
    Linear { span: f64 },
    Custom(Arc<dyn Fn(&TypeValue, &TypeValue) -> f64 + Send + Sync>),
}

impl Similarity {
    pub fn custom(f: impl Fn(&TypeValue, &TypeValue) -> f64 + Send + Sync + 'static) -> Self {
        Similarity::Custom(Arc::new(f))
    }

    pub fn between(&self, own: &TypeValue, other: &TypeValue) -> f64 {
        match self {
            Similarity::Exact => match (own, other) {
                (TypeValue::Scalar(a), TypeValue::Scalar(b)) => indicator(a == b),
                _ => indicator(own.same_label(other)),
            },
            Similarity::Within { max_distance, metric } => match own.distance(other, *metric) {
                Some(d) => indicator(d <= *max_distance),
                None => indicator(own.same_label(other)),
            },
            Similarity::Linear { span } => match own.distance(other, Metric::Absolute) {
                Some(d) if *span > 0.0 => (1.0 - d / span).max(0.0),
                Some(d) => indicator(d == 0.0),
                None => indicator(own.same_label(other)),
            },
            Similarity::Custom(f) => f(own, other),
        }
    }

    fn sum(&self, own: &TypeValue, neighbors: &[&TypeValue]) -> f64 {
        neighbors.iter().map(|n| self.between(own, n)).sum()
    }
}

fn indicator(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl fmt::Debug for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Similarity::Exact => write!(f, "Exact"),
            Similarity::Within { max_distance, metric } => f
                .debug_struct("Within")
                .field("max_distance", max_distance)
                .field("metric", metric)
                .finish(),
            Similarity::Linear { span } => f.debug_struct("Linear").field("span", span).finish(),
            Similarity::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Acceptable raw scores; anything outside maps to [`BAD_UTILITY`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn apply(&self, raw: f64) -> f64 {
        let below = self.min.is_some_and(|min| raw < min);
        let above = self.max.is_some_and(|max| raw > max);
        if below || above {
            BAD_UTILITY
        } else {
            raw
        }
    }

    /// Range of `apply` over raw scores in `range`
    fn clamp_range(&self, range: ScoreRange) -> ScoreRange {
        if self.is_unbounded() {
            return range;
        }
        let lo = self.min.map_or(range.lo, |min| range.lo.max(min));
        let hi = self.max.map_or(range.hi, |max| range.hi.min(max));
        ScoreRange::new(lo.min(BAD_UTILITY), hi.max(BAD_UTILITY))
    }
}

/// Scores one dimension of an agent's neighborhood.
pub trait Criterion: Send + Sync {
    fn evaluate(&self, own: &TypeValue, neighbors: &[&TypeValue]) -> Result<f64, UtilityError>;

    fn range(&self) -> ScoreRange {
        ScoreRange::UNBOUNDED
    }
}

impl<T: Criterion + ?Sized> Criterion for Box<T> {
    fn evaluate(&self, own: &TypeValue, neighbors: &[&TypeValue]) -> Result<f64, UtilityError> {
        (**self).evaluate(own, neighbors)
    }

    fn range(&self) -> ScoreRange {
        (**self).range()
    }
}

/// Sum of similarities to each neighbor.
///
/// With exact similarity this is the number of same-type neighbors.
#[derive(Debug, Clone, Default)]
pub struct Count {
    pub similarity: Similarity,
    pub bounds: Bounds,
}

impl Count {
    pub fn new(similarity: Similarity) -> Self {
        Self {
            similarity,
            bounds: Bounds::default(),
        }
    }

    pub fn bounded(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.bounds = Bounds::new(min, max);
        self
    }
}

impl Criterion for Count {
    fn evaluate(&self, own: &TypeValue, neighbors: &[&TypeValue]) -> Result<f64, UtilityError> {
        Ok(self.bounds.apply(self.similarity.sum(own, neighbors)))
    }

    fn range(&self) -> ScoreRange {
        // Custom similarities may leave [0, 1]
        let raw = match self.similarity {
            Similarity::Custom(_) => ScoreRange::UNBOUNDED,
            _ => ScoreRange::new(0.0, f64::INFINITY),
        };
        self.bounds.clamp_range(raw)
    }
}

/// Mean similarity to the neighbors.
#[derive(Debug, Clone)]
pub struct Ratio {
    pub similarity: Similarity,
    /// Fewer neighbors than this yields `fallback`
    pub min_neighbors: usize,
    pub fallback: f64,
    /// Count the agent itself: `(same + 1) / (all + 1)`
    pub self_inclusive: bool,
    pub bounds: Bounds,
}

impl Ratio {
    /// Plain ratio; an agent with no neighbors scores zero.
    pub fn new(similarity: Similarity) -> Self {
        Self {
            similarity,
            min_neighbors: 1,
            fallback: 0.0,
            self_inclusive: false,
            bounds: Bounds::default(),
        }
    }

    /// Ratio that counts the agent among its own neighbors.
    pub fn self_inclusive(similarity: Similarity) -> Self {
        Self {
            min_neighbors: 0,
            self_inclusive: true,
            ..Self::new(similarity)
        }
    }

    pub fn with_fallback(mut self, min_neighbors: usize, fallback: f64) -> Self {
        self.min_neighbors = min_neighbors;
        self.fallback = fallback;
        self
    }

    pub fn bounded(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.bounds = Bounds::new(min, max);
        self
    }
}

impl Criterion for Ratio {
    fn evaluate(&self, own: &TypeValue, neighbors: &[&TypeValue]) -> Result<f64, UtilityError> {
        if neighbors.len() < self.min_neighbors {
            return Ok(self.fallback);
        }
        let same = self.similarity.sum(own, neighbors);
        let n = neighbors.len() as f64;
        let ratio = if self.self_inclusive {
            (same + 1.0) / (n + 1.0)
        } else if neighbors.is_empty() {
            return Ok(self.fallback);
        } else {
            same / n
        };
        Ok(self.bounds.apply(ratio))
    }

    fn range(&self) -> ScoreRange {
        let raw = match self.similarity {
            Similarity::Custom(_) => ScoreRange::UNBOUNDED,
            _ => ScoreRange::new(0.0, 1.0),
        };
        let range = self.bounds.clamp_range(raw);
        range.union(ScoreRange::new(self.fallback, self.fallback))
    }
}

/// Dispatches on the agent's own label: each label has its own criterion.
///
/// An agent whose label has no entry cannot be scored.
#[derive(Default)]
pub struct PerLabel {
    by_label: BTreeMap<String, Box<dyn Criterion>>,
}

impl PerLabel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: impl Into<String>, criterion: impl Criterion + 'static) -> Self {
        self.by_label.insert(label.into(), Box::new(criterion));
        self
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.by_label.keys().map(String::as_str)
    }
}

impl Criterion for PerLabel {
    fn evaluate(&self, own: &TypeValue, neighbors: &[&TypeValue]) -> Result<f64, UtilityError> {
        let label = match own {
            TypeValue::Label(label) => label.as_str(),
            TypeValue::Scalar(x) => return Err(UtilityError::UndefinedLabel(x.to_string())),
        };
        self.by_label
            .get(label)
            .ok_or_else(|| UtilityError::UndefinedLabel(label.to_string()))?
            .evaluate(own, neighbors)
    }

    fn range(&self) -> ScoreRange {
        let mut ranges = self.by_label.values().map(|c| c.range());
        match ranges.next() {
            Some(first) => ranges.fold(first, ScoreRange::union),
            None => ScoreRange::UNBOUNDED,
        }
    }
}
