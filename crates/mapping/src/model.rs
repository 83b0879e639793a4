use crate::error::{MappingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Mapping of one method. `descriptor` is the symbolic JVM descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMapping {
    #[serde(rename = "name")]
    pub symbolic_name: String,
    pub descriptor: String,
    #[serde(rename = "runtime")]
    pub runtime_name: String,
}

impl MethodMapping {
    pub fn new(
        symbolic_name: impl Into<String>,
        descriptor: impl Into<String>,
        runtime_name: impl Into<String>,
    ) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            descriptor: descriptor.into(),
            runtime_name: runtime_name.into(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.symbolic_name == self.runtime_name
    }

    /// Name plus the parameter part of the descriptor, e.g. `tick(I)`.
    pub fn symbolic_identifier(&self) -> String {
        format!("{}{}", self.symbolic_name, descriptor_parameters(&self.descriptor))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(rename = "name")]
    pub symbolic_name: String,
    #[serde(rename = "runtime")]
    pub runtime_name: String,
}

impl FieldMapping {
    pub fn new(symbolic_name: impl Into<String>, runtime_name: impl Into<String>) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            runtime_name: runtime_name.into(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.symbolic_name == self.runtime_name
    }
}

/// Mapping of one class and its members. Class names are binary names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMapping {
    pub symbolic: String,
    pub runtime: String,
    #[serde(default)]
    pub methods: Vec<MethodMapping>,
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
}

/// A method mapping together with the class mapping that owns it.
#[derive(Debug, Clone, Copy)]
pub struct OwnedMethod<'a> {
    pub class: &'a ClassMapping,
    pub method: &'a MethodMapping,
}

impl ClassMapping {
    pub fn new(symbolic: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self {
            symbolic: symbolic.into(),
            runtime: runtime.into(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: MethodMapping) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_field(mut self, field: FieldMapping) -> Self {
        self.fields.push(field);
        self
    }

    pub fn is_default(&self) -> bool {
        self.symbolic == self.runtime
    }

    pub fn methods(&self) -> impl Iterator<Item = OwnedMethod<'_>> {
        self.methods
            .iter()
            .map(move |method| OwnedMethod { class: self, method })
    }
}

/// All mappings of one game version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSet {
    pub version: String,
    #[serde(default)]
    pub classes: Vec<ClassMapping>,
}

impl MappingSet {
    pub fn new(version: impl Into<String>, classes: Vec<ClassMapping>) -> Self {
        Self {
            version: version.into(),
            classes,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let set: MappingSet = serde_json::from_str(json)?;
        set.validate()?;
        Ok(set)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects two class mappings for the same symbolic name.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for class in &self.classes {
            if !seen.insert(class.symbolic.as_str()) {
                return Err(MappingError::Duplicate(class.symbolic.clone()));
            }
        }
        Ok(())
    }

    pub fn class(&self, symbolic: &str) -> Option<&ClassMapping> {
        self.classes.iter().find(|c| c.symbolic == symbolic)
    }

    pub fn methods(&self) -> impl Iterator<Item = OwnedMethod<'_>> {
        self.classes.iter().flat_map(ClassMapping::methods)
    }
}

/// Parameter part of a descriptor up to and including the last `)`; empty
/// for field descriptors.
pub fn descriptor_parameters(descriptor: &str) -> &str {
    match descriptor.rfind(')') {
        Some(end) => &descriptor[..=end],
        None => "",
    }
}
