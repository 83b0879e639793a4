//! Event filter values declared by listeners and supplied by events.
//!
//! The framework core raises no events itself. These types are public API
//! for event bus implementations, which match a listener's required values
//! against an event's provided ones with [`crate::Weft::filter_matches`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use weft_api::models::naming;
use weft_mapping::ClassHierarchy;
use weft_mapping::hierarchy::ancestors;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FilterValue {
    /// Binary type name; matches itself and every subtype.
    Type(String),
    Text(String),
    Int(i64),
    Bool(bool),
}

impl FilterValue {
    /// Whether a provided value satisfies this required one.
    pub fn accepts(&self, provided: &FilterValue, hierarchy: &dyn ClassHierarchy) -> bool {
        match (self, provided) {
            (FilterValue::Type(required), FilterValue::Type(provided)) => {
                required == provided || {
                    let required = naming::to_internal(required);
                    ancestors(hierarchy, &naming::to_internal(provided)).contains(&required)
                }
            }
            _ => self == provided,
        }
    }
}

/// Named filter values, e.g. `{"entity": Type("net.game.Entity")}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMapping {
    values: BTreeMap<String, FilterValue>,
}

impl FilterMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: FilterValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every required value must be provided and accepted. Extra provided
    /// values are ignored.
    pub fn matches(required: &FilterMapping, provided: &FilterMapping, hierarchy: &dyn ClassHierarchy) -> bool {
        required.values.iter().all(|(name, value)| {
            provided
                .get(name)
                .is_some_and(|provided| value.accepts(provided, hierarchy))
        })
    }
}
