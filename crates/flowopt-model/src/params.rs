//! Parameter sets
//!
//! An ordered, immutable mapping from parameter name to numeric or boolean
//! value. Every optimization step produces a new set; the schema (key set and
//! value types) of the initial set is binding for all descendants.

use crate::error::ModelError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean toggle (e.g., feature on/off)
    Bool(bool),
    /// Numeric value (thresholds, window sizes)
    Number(f64),
}

impl ParamValue {
    /// Numeric value, if this is a number
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Bool(_) => None,
        }
    }

    /// Boolean value, if this is a toggle
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Number(_) => None,
        }
    }

    /// Whether two values carry the same type
    #[inline]
    #[must_use]
    pub fn same_type(&self, other: &ParamValue) -> bool {
        matches!(
            (self, other),
            (ParamValue::Bool(_), ParamValue::Bool(_))
                | (ParamValue::Number(_), ParamValue::Number(_))
        )
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Number(n)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

/// Ordered mapping from parameter name to value
///
/// Insertion order is preserved so that serialized artifacts and proposal
/// prompts are stable across runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    entries: IndexMap<String, ParamValue>,
}

impl ParameterSet {
    /// Create an empty parameter set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion
    #[inline]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    /// Look up a parameter by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.get(name)
    }

    /// Numeric parameter shortcut
    #[inline]
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_number)
    }

    /// Number of parameters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Validate a proposed successor against this set's schema
    ///
    /// Enforces key-set equality across a lineage: every key of `self` must
    /// be present in `candidate`, no key may change its value type, and no
    /// new key may be introduced.
    ///
    /// # Errors
    /// - `ModelError::ParameterMissing` if a key was dropped
    /// - `ModelError::ParameterTypeChanged` if a key switched number/bool
    /// - `ModelError::ParameterAdded` if a key outside the schema appears
    pub fn validate_successor(&self, candidate: &ParameterSet) -> Result<(), ModelError> {
        for (name, value) in &self.entries {
            match candidate.entries.get(name) {
                None => {
                    return Err(ModelError::ParameterMissing {
                        name: name.clone(),
                    })
                }
                Some(proposed) if !value.same_type(proposed) => {
                    return Err(ModelError::ParameterTypeChanged {
                        name: name.clone(),
                    })
                }
                Some(_) => {}
            }
        }
        for name in candidate.entries.keys() {
            if !self.entries.contains_key(name) {
                return Err(ModelError::ParameterAdded { name: name.clone() });
            }
        }
        Ok(())
    }

    /// Key set as a sorted vector (for assertions and diagnostics)
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl FromIterator<(String, ParamValue)> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> ParameterSet {
        ParameterSet::new()
            .with("take_profit", 2.5)
            .with("stop_loss", 1.0)
            .with("use_trailing", true)
    }

    #[test]
    fn lookup_and_order() {
        let params = base();
        assert_eq!(params.number("take_profit"), Some(2.5));
        assert_eq!(params.get("use_trailing").and_then(ParamValue::as_bool), Some(true));

        let names: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["take_profit", "stop_loss", "use_trailing"]);
    }

    #[test]
    fn successor_with_same_schema_accepted() {
        let params = base();
        let next = base().with("take_profit", 2.6);
        assert!(params.validate_successor(&next).is_ok());
    }

    #[test]
    fn successor_missing_key_rejected() {
        let params = base();
        let next = ParameterSet::new().with("take_profit", 2.6).with("stop_loss", 1.0);
        let err = params.validate_successor(&next).unwrap_err();
        assert!(matches!(err, ModelError::ParameterMissing { ref name } if name == "use_trailing"));
    }

    #[test]
    fn successor_type_change_rejected() {
        let params = base();
        let next = base().with("use_trailing", 0.0);
        let err = params.validate_successor(&next).unwrap_err();
        assert!(matches!(err, ModelError::ParameterTypeChanged { ref name } if name == "use_trailing"));
    }

    #[test]
    fn extra_keys_in_successor_rejected() {
        // Key sets must match exactly; growth would let later generations
        // drift away from the initial schema.
        let params = base();
        let next = base().with("cooldown", 3.0);
        let err = params.validate_successor(&next).unwrap_err();
        assert!(matches!(err, ModelError::ParameterAdded { ref name } if name == "cooldown"));
    }

    #[test]
    fn serde_round_trip() {
        let params = base();
        let json = serde_json::to_string(&params).unwrap();
        let back: ParameterSet = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }
}
