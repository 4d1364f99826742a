//! # Type Model
//!
//! In-memory tree of the types to generate from one schema. Built fresh per schema,
//! never mutated after construction, discarded after emission.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Options controlling what the emitter generates for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationOptions {
    /// Emit `with_<field>` builder methods.
    pub builders: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { builders: true }
    }
}

/// Semantic type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum FieldType {
    /// `String`.
    String,
    /// `i64`.
    Integer,
    /// `f64`.
    Number,
    /// `bool`.
    Boolean,
    /// `Vec<T>`.
    Array(Box<FieldType>),
    /// `BTreeMap<String, T>` (from `additionalProperties`).
    Map(Box<FieldType>),
    /// Another generated type of the same model tree.
    Object {
        /// Type name of the target.
        name: String,
        /// Reference closes a cycle and must be boxed.
        boxed: bool,
    },
    /// Anything without a usable shape; carried as raw JSON text.
    Any,
}

impl FieldType {
    /// The parameter kind a `set_<field>` mutator for this type accepts.
    pub fn param_kind(&self) -> ParamKind {
        match self {
            FieldType::String | FieldType::Any => ParamKind::String,
            FieldType::Integer => ParamKind::Integer,
            FieldType::Number => ParamKind::Number,
            FieldType::Boolean => ParamKind::Boolean,
            FieldType::Array(_) | FieldType::Map(_) | FieldType::Object { .. } => {
                ParamKind::Other
            }
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Number => write!(f, "number"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Array(inner) => write!(f, "array<{}>", inner),
            FieldType::Map(inner) => write!(f, "map<{}>", inner),
            FieldType::Object { name, .. } => write!(f, "{}", name),
            FieldType::Any => write!(f, "any"),
        }
    }
}

/// Kind of the single parameter of a generated mutator.
///
/// Only `String`, `Integer` and `Boolean` can be probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// `String`.
    String,
    /// `i64`.
    Integer,
    /// `f64`.
    Number,
    /// `bool`.
    Boolean,
    /// Collections and generated types.
    Other,
}

impl ParamKind {
    /// Variant name used in the generated code (`crate::ParamKind::<name>`).
    pub fn variant(self) -> &'static str {
        match self {
            ParamKind::String => "String",
            ParamKind::Integer => "Integer",
            ParamKind::Number => "Number",
            ParamKind::Boolean => "Boolean",
            ParamKind::Other => "Other",
        }
    }
}

impl Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKind::String => write!(f, "string"),
            ParamKind::Integer => write!(f, "integer"),
            ParamKind::Number => write!(f, "number"),
            ParamKind::Boolean => write!(f, "boolean"),
            ParamKind::Other => write!(f, "other"),
        }
    }
}

/// One field of a generated type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Property name in the schema.
    pub property: String,
    /// Rust identifier of the struct field (snake_case, sanitised, unique per type).
    pub ident: String,
    /// Semantic type.
    pub ty: FieldType,
    /// Listed in `required` and not nullable.
    pub required: bool,
    /// `description` of the property, if any.
    pub description: Option<String>,
}

impl Field {
    /// Name of the mutator (`set_<ident>`).
    pub fn setter(&self) -> String {
        format!("set_{}", self.ident.trim_end_matches('_'))
    }

    /// Name of the builder method (`with_<ident>`).
    pub fn builder(&self) -> String {
        format!("with_{}", self.ident.trim_end_matches('_'))
    }

    /// Whether the struct field is wrapped in `Option`.
    pub fn is_optional(&self) -> bool {
        !self.required || matches!(self.ty, FieldType::Object { boxed: true, .. })
    }
}

/// A type to generate, owning the types nested below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeModel {
    /// Type name (PascalCase, unique within the tree).
    pub name: String,
    /// Dotted namespace, may be empty.
    pub package: String,
    /// Logical name of the schema the model came from.
    pub schema: String,
    /// `description` of the schema node.
    pub description: Option<String>,
    /// Fields in document order.
    pub fields: Vec<Field>,
    /// Types first referenced from this one.
    pub nested: Vec<TypeModel>,
    /// What to generate.
    pub options: GenerationOptions,
}

impl TypeModel {
    /// `package.Name`, or just `Name` without a package.
    pub fn qualified_name(&self) -> String {
        qualify(&self.package, &self.name)
    }

    /// Pre-order walk over this model and every nested model.
    pub fn walk(&self) -> Vec<&TypeModel> {
        let mut out = vec![self];
        for child in &self.nested {
            out.extend(child.walk());
        }
        out
    }

    /// Looks a type up by name anywhere in the tree.
    pub fn find(&self, name: &str) -> Option<&TypeModel> {
        self.walk().into_iter().find(|m| m.name == name)
    }
}

/// Joins a package and a type name.
pub fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}
