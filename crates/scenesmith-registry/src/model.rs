//! Catalog entry types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared parameter type, inferred from the documentation's type text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Float,
    Int,
    Boolean,
    String,
    Enum,
    Array,
    Unknown,
}

impl ParamType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Enum => "enum",
            Self::Array => "array",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parameter of an operation signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    /// Default value as written in the signature
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

/// Creation-class operations bring an object into existence; mutation-class
/// operations modify one that must already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    Creation,
    Mutation,
    Neutral,
}

impl OperationClass {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Creation => "creation",
            Self::Mutation => "mutation",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry. Identity is `name`; immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Fully qualified name, e.g. `bpy.ops.mesh.primitive_cube_add`
    pub name: String,
    pub parameters: Vec<ParamSpec>,
    pub description: String,
    /// Primary category first, then keyword tags in sorted order
    pub categories: Vec<String>,
}

impl OperationSpec {
    /// Dotted prefix of the name (`bpy.ops.mesh`)
    #[must_use]
    pub fn module(&self) -> &str {
        self.name.rsplit_once('.').map_or("", |(module, _)| module)
    }

    /// Last name segment (`primitive_cube_add`)
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.name.rsplit_once('.').map_or(self.name.as_str(), |(_, leaf)| leaf)
    }

    #[must_use]
    pub fn primary_category(&self) -> &str {
        self.categories.first().map_or("other", String::as_str)
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.categories.iter().any(|c| c == tag)
    }

    #[must_use]
    pub fn class(&self) -> OperationClass {
        crate::classify::class_of(&self.categories)
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.parameters.iter().filter(|p| p.required)
    }
}
