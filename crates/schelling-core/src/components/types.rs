//! Type Space
//!
//! Per-dimension type domains (categorical labels or continuous intervals)
//! and the type vectors agents carry.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ConfigError;
use schelling_events::AgentId;

/// One value of a type vector.
///
/// Deserializes from a bare string (label) or number (scalar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeValue {
    Label(String),
    Scalar(f64),
}

impl TypeValue {
    pub fn label(label: impl Into<String>) -> Self {
        TypeValue::Label(label.into())
    }

    pub fn scalar(value: f64) -> Self {
        TypeValue::Scalar(value)
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            TypeValue::Label(l) => Some(l),
            TypeValue::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            TypeValue::Scalar(x) => Some(*x),
            TypeValue::Label(_) => None,
        }
    }

    /// Label equality. Scalars never compare equal through this.
    pub fn same_label(&self, other: &TypeValue) -> bool {
        match (self, other) {
            (TypeValue::Label(a), TypeValue::Label(b)) => a == b,
            _ => false,
        }
    }

    /// Distance between two scalars, `None` if either is a label.
    pub fn distance(&self, other: &TypeValue, metric: Metric) -> Option<f64> {
        match (self, other) {
            (TypeValue::Scalar(a), TypeValue::Scalar(b)) => Some(metric.distance(*a, *b)),
            _ => None,
        }
    }
}

impl From<&str> for TypeValue {
    fn from(label: &str) -> Self {
        TypeValue::Label(label.to_string())
    }
}

impl From<f64> for TypeValue {
    fn from(value: f64) -> Self {
        TypeValue::Scalar(value)
    }
}

/// Distance metric for continuous values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// |a - b|
    #[default]
    Absolute,
    /// |ln a - ln b|, infinite unless both values are positive
    Logarithmic,
}

impl Metric {
    pub fn distance(self, a: f64, b: f64) -> f64 {
        match self {
            Metric::Absolute => (a - b).abs(),
            Metric::Logarithmic => {
                if a > 0.0 && b > 0.0 {
                    (a.ln() - b.ln()).abs()
                } else {
                    f64::INFINITY
                }
            }
        }
    }
}

/// Domain of one type dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDimension {
    /// Finite label set (race, religion, ...)
    Categorical { name: String, labels: Vec<String> },
    /// Closed interval [lo, hi] (income, extraversion, ...)
    Continuous { name: String, lo: f64, hi: f64 },
}

impl TypeDimension {
    pub fn categorical<S: Into<String>>(name: impl Into<String>, labels: impl IntoIterator<Item = S>) -> Self {
        TypeDimension::Categorical {
            name: name.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn continuous(name: impl Into<String>, lo: f64, hi: f64) -> Self {
        TypeDimension::Continuous {
            name: name.into(),
            lo,
            hi,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeDimension::Categorical { name, .. } | TypeDimension::Continuous { name, .. } => name,
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, TypeDimension::Categorical { .. })
    }

    /// Interval width of a continuous dimension.
    pub fn span(&self) -> Option<f64> {
        match self {
            TypeDimension::Continuous { lo, hi, .. } => Some(hi - lo),
            TypeDimension::Categorical { .. } => None,
        }
    }

    /// True if the value has this dimension's kind and lies in its domain.
    pub fn contains(&self, value: &TypeValue) -> bool {
        match (self, value) {
            (TypeDimension::Categorical { labels, .. }, TypeValue::Label(l)) => labels.contains(l),
            (TypeDimension::Continuous { lo, hi, .. }, TypeValue::Scalar(x)) => *lo <= *x && *x <= *hi,
            _ => false,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidDomain {
            dimension: self.name().to_string(),
            reason: reason.to_string(),
        };
        match self {
            TypeDimension::Categorical { labels, .. } => {
                if labels.is_empty() {
                    return Err(invalid("label set is empty"));
                }
                let unique: HashSet<&String> = labels.iter().collect();
                if unique.len() != labels.len() {
                    return Err(invalid("label set contains duplicates"));
                }
            }
            TypeDimension::Continuous { lo, hi, .. } => {
                if !lo.is_finite() || !hi.is_finite() {
                    return Err(invalid("interval bounds must be finite"));
                }
                if lo > hi {
                    return Err(invalid("interval lower bound exceeds upper bound"));
                }
            }
        }
        Ok(())
    }
}

/// Ordered values, one per dimension of a type space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeVector(Vec<TypeValue>);

impl TypeVector {
    pub fn new(values: Vec<TypeValue>) -> Self {
        Self(values)
    }

    pub fn get(&self, index: usize) -> Option<&TypeValue> {
        self.0.get(index)
    }

    pub fn values(&self) -> &[TypeValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<TypeValue> for TypeVector {
    fn from_iter<I: IntoIterator<Item = TypeValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Validated list of type dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TypeDimension>", into = "Vec<TypeDimension>")]
pub struct TypeSpace {
    dimensions: Vec<TypeDimension>,
}

impl TypeSpace {
    /// Fails with `InvalidDomain` on an empty label set, `lo > hi`, non-finite
    /// bounds, duplicate labels or duplicate dimension names.
    pub fn new(dimensions: Vec<TypeDimension>) -> Result<Self, ConfigError> {
        let mut names = HashSet::new();
        for dimension in &dimensions {
            dimension.validate()?;
            if !names.insert(dimension.name()) {
                return Err(ConfigError::InvalidDomain {
                    dimension: dimension.name().to_string(),
                    reason: "dimension name is used twice".to_string(),
                });
            }
        }
        Ok(Self { dimensions })
    }

    pub fn dimension_count(&self) -> usize {
        self.dimensions.len()
    }

    pub fn domain_of(&self, index: usize) -> Option<&TypeDimension> {
        self.dimensions.get(index)
    }

    pub fn dimensions(&self) -> &[TypeDimension] {
        &self.dimensions
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name() == name)
    }

    pub fn validate(&self, vector: &TypeVector) -> bool {
        self.mismatch(vector).is_none()
    }

    /// Like `validate`, naming the first offending dimension.
    pub fn check(&self, agent: AgentId, vector: &TypeVector) -> Result<(), ConfigError> {
        match self.mismatch(vector) {
            None => Ok(()),
            Some(reason) => Err(ConfigError::TypeVectorMismatch { agent, reason }),
        }
    }

    fn mismatch(&self, vector: &TypeVector) -> Option<String> {
        if vector.len() != self.dimensions.len() {
            return Some(format!(
                "expected {} values, got {}",
                self.dimensions.len(),
                vector.len()
            ));
        }
        self.dimensions
            .iter()
            .zip(vector.values())
            .find(|(dimension, value)| !dimension.contains(value))
            .map(|(dimension, value)| format!("{:?} is not in the domain of {}", value, dimension.name()))
    }
}

impl TryFrom<Vec<TypeDimension>> for TypeSpace {
    type Error = ConfigError;

    fn try_from(dimensions: Vec<TypeDimension>) -> Result<Self, Self::Error> {
        TypeSpace::new(dimensions)
    }
}

impl From<TypeSpace> for Vec<TypeDimension> {
    fn from(space: TypeSpace) -> Self {
        space.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> TypeSpace {
        TypeSpace::new(vec![
            TypeDimension::categorical("color", ["red", "blue"]),
            TypeDimension::continuous("income", 0.0, 10.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_inverted_interval() {
        let err = TypeSpace::new(vec![TypeDimension::continuous("income", 2.0, 1.0)]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDomain { .. }));
    }

    #[test]
    fn test_rejects_empty_label_set() {
        let labels: Vec<String> = Vec::new();
        let err = TypeSpace::new(vec![TypeDimension::categorical("color", labels)]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDomain { .. }));
    }

    #[test]
    fn test_degenerate_interval_is_valid() {
        assert!(TypeSpace::new(vec![TypeDimension::continuous("x", 1.0, 1.0)]).is_ok());
    }

    #[test]
    fn test_validate_vectors() {
        let space = space();
        assert_eq!(space.dimension_count(), 2);
        assert_eq!(space.index_of("income"), Some(1));

        let ok = TypeVector::new(vec!["red".into(), 4.5.into()]);
        assert!(space.validate(&ok));

        let wrong_label = TypeVector::new(vec!["green".into(), 4.5.into()]);
        assert!(!space.validate(&wrong_label));

        let out_of_range = TypeVector::new(vec!["red".into(), 10.5.into()]);
        assert!(!space.validate(&out_of_range));

        let swapped_kinds = TypeVector::new(vec![4.5.into(), "red".into()]);
        assert!(!space.validate(&swapped_kinds));

        let short = TypeVector::new(vec!["red".into()]);
        let err = space.check(AgentId::new(2), &short).unwrap_err();
        assert!(matches!(err, ConfigError::TypeVectorMismatch { .. }));
    }

    #[test]
    fn test_metric_distance() {
        assert_eq!(Metric::Absolute.distance(1.0, 3.5), 2.5);
        assert!((Metric::Logarithmic.distance(1.0, std::f64::consts::E) - 1.0).abs() < 1e-12);
        assert!(Metric::Logarithmic.distance(0.0, 1.0).is_infinite());
    }

    #[test]
    fn test_type_value_comparisons() {
        let a = TypeValue::label("red");
        assert!(a.same_label(&TypeValue::label("red")));
        assert!(!a.same_label(&TypeValue::scalar(1.0)));
        assert_eq!(
            TypeValue::scalar(2.0).distance(&TypeValue::scalar(0.5), Metric::Absolute),
            Some(1.5)
        );
        assert_eq!(a.distance(&TypeValue::scalar(0.5), Metric::Absolute), None);
    }

    #[test]
    fn test_type_space_deserialization_validates() {
        let json = r#"[{"kind": "continuous", "name": "income", "lo": 3.0, "hi": 1.0}]"#;
        assert!(serde_json::from_str::<TypeSpace>(json).is_err());

        let json = r#"[{"kind": "categorical", "name": "color", "labels": ["a", "b"]}]"#;
        let space: TypeSpace = serde_json::from_str(json).unwrap();
        assert!(space.domain_of(0).unwrap().is_categorical());
    }
}
