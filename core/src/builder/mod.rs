//! # Type Model Builder
//!
//! Interprets a JSON Schema document and produces the [`TypeModel`] tree to generate.
//!
//! Supported subset:
//! * `type` (including type arrays, where `"null"` makes a property optional)
//! * `properties` in document order, `required`, `items`, `additionalProperties`
//! * `enum` / `const` (element type inferred from the first value)
//! * local `$ref`, shared targets generated once, cycles boxed
//!
//! When a root helper is configured, the returned tree is a wrapper type of that
//! name holding the root type in its single `root` field.

mod naming;
mod refs;

pub use naming::{allocate_field, is_keyword, singular, snake_ident, type_name, NameAllocator};

use crate::config::RootNaming;
use crate::error::{AppError, AppResult};
use crate::model::{Field, FieldType, GenerationOptions, TypeModel};
use crate::source::Schema;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Builds type models for one package under one root naming policy.
#[derive(Debug, Clone)]
pub struct TypeModelBuilder {
    package: String,
    naming: RootNaming,
    root_helper: Option<String>,
    options: GenerationOptions,
}

impl TypeModelBuilder {
    /// A builder placing types into `package` (dotted, may be empty).
    pub fn new(package: impl Into<String>, naming: RootNaming) -> Self {
        Self {
            package: package.into(),
            naming,
            root_helper: None,
            options: GenerationOptions::default(),
        }
    }

    /// Wraps the root type in a helper type named `helper`.
    pub fn with_root_helper(mut self, helper: Option<String>) -> Self {
        self.root_helper = helper;
        self
    }

    /// The raw name the root type of `schema` is derived from.
    pub fn root_type_name(&self, schema: &Schema) -> String {
        match &self.naming {
            RootNaming::Fixed(name) => name.clone(),
            RootNaming::FromSchemaName => schema.name.clone(),
        }
    }

    /// Builds the type tree of `schema`.
    ///
    /// Malformed documents, unsupported constructs and unresolvable references fail
    /// with [`AppError::SchemaParse`].
    pub fn build(&self, schema: &Schema) -> AppResult<TypeModel> {
        let document: Value = serde_json::from_slice(&schema.content)
            .map_err(|e| AppError::parse(&schema.name, e.to_string()))?;
        if !document.is_object() {
            return Err(AppError::parse(
                &schema.name,
                "root schema must be a JSON object",
            ));
        }

        let self_id = document
            .get("$id")
            .or_else(|| document.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut session = Session {
            schema: &schema.name,
            package: &self.package,
            options: self.options,
            document: &document,
            self_id,
            names: NameAllocator::default(),
            refs: HashMap::new(),
            in_progress: HashSet::new(),
            aliases: HashSet::new(),
        };

        // The helper claims its name first so exclusion by name never hits the root.
        let helper_name = self
            .root_helper
            .as_deref()
            .map(|helper| session.names.allocate(helper));
        let root_name = session.names.allocate(&self.root_type_name(schema));
        let mut model = session.build_object(root_name, &document, "")?;
        if let Some(helper_name) = helper_name {
            model = session.wrap(helper_name, model);
        }
        tracing::debug!(
            schema = %schema.name,
            types = model.walk().len(),
            "built type model"
        );
        Ok(model)
    }
}

/// State of one `build` call.
struct Session<'a> {
    schema: &'a str,
    package: &'a str,
    options: GenerationOptions,
    document: &'a Value,
    self_id: Option<String>,
    names: NameAllocator,
    /// Pointer of every object node already given a type name.
    refs: HashMap<String, String>,
    /// Pointers of the types currently being built; references to them are boxed.
    in_progress: HashSet<String>,
    /// Non-object `$ref` targets being resolved inline.
    aliases: HashSet<String>,
}

impl<'a> Session<'a> {
    fn error(&self, pointer: &str, message: impl std::fmt::Display) -> AppError {
        AppError::parse(self.schema, format!("{} at #{}", message, pointer))
    }

    fn wrap(&self, name: String, root: TypeModel) -> TypeModel {
        TypeModel {
            name,
            package: self.package.to_string(),
            schema: self.schema.to_string(),
            description: None,
            fields: vec![Field {
                property: "root".to_string(),
                ident: "root".to_string(),
                ty: FieldType::Object {
                    name: root.name.clone(),
                    boxed: false,
                },
                required: true,
                description: None,
            }],
            nested: vec![root],
            options: self.options,
        }
    }

    fn build_object(&mut self, name: String, node: &'a Value, pointer: &str) -> AppResult<TypeModel> {
        let Some(object) = node.as_object() else {
            return Err(self.error(pointer, "expected an object schema"));
        };
        if let Some(declared) = declared_type(object) {
            if declared != "object" {
                return Err(self.error(
                    pointer,
                    format!("expected type 'object', found '{}'", declared),
                ));
            }
        }

        self.refs.insert(pointer.to_string(), name.clone());
        self.in_progress.insert(pointer.to_string());

        let required: HashSet<&str> = object
            .get("required")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut fields = Vec::new();
        let mut nested = Vec::new();
        let mut used = HashSet::from(["new".to_string()]);

        if let Some(properties) = object.get("properties") {
            let Some(properties) = properties.as_object() else {
                return Err(self.error(pointer, "'properties' must be an object"));
            };
            for (property, sub) in properties {
                let sub_pointer = format!("{}/properties/{}", pointer, escape(property));
                let ty = self.resolve_type(sub, &sub_pointer, property, &mut nested)?;
                fields.push(Field {
                    property: property.clone(),
                    ident: allocate_field(&mut used, property),
                    ty,
                    required: required.contains(property.as_str()) && !is_nullable(sub),
                    description: description(sub),
                });
            }
        }

        let additional = match object.get("additionalProperties") {
            Some(Value::Bool(true)) => Some(FieldType::Any),
            Some(schema @ Value::Object(_)) => {
                let sub_pointer = format!("{}/additionalProperties", pointer);
                let hint = format!("{}Value", name);
                Some(self.resolve_type(schema, &sub_pointer, &hint, &mut nested)?)
            }
            _ => None,
        };
        if let Some(value) = additional {
            fields.push(Field {
                property: "additionalProperties".to_string(),
                ident: allocate_field(&mut used, "additional_properties"),
                ty: FieldType::Map(Box::new(value)),
                required: true,
                description: None,
            });
        }

        self.in_progress.remove(pointer);

        Ok(TypeModel {
            name,
            package: self.package.to_string(),
            schema: self.schema.to_string(),
            description: description(node),
            fields,
            nested,
            options: self.options,
        })
    }

    fn resolve_type(
        &mut self,
        node: &'a Value,
        pointer: &str,
        hint: &str,
        nested: &mut Vec<TypeModel>,
    ) -> AppResult<FieldType> {
        let object = match node {
            Value::Object(object) => object,
            Value::Bool(true) => return Ok(FieldType::Any),
            _ => return Err(self.error(pointer, "expected a schema object")),
        };

        if let Some(reference) = object.get("$ref") {
            let Some(reference) = reference.as_str() else {
                return Err(self.error(pointer, "'$ref' must be a string"));
            };
            return self.resolve_ref(reference, pointer, nested);
        }

        let kind = match object.get("type") {
            Some(Value::String(kind)) => kind.as_str(),
            Some(Value::Array(kinds)) => {
                let concrete: Vec<&str> = kinds
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|k| *k != "null")
                    .collect();
                match concrete.as_slice() {
                    [] => "null",
                    [single] => single,
                    _ => return Ok(FieldType::Any),
                }
            }
            Some(_) => return Err(self.error(pointer, "'type' must be a string or an array")),
            None => inferred_type(object),
        };

        match kind {
            "string" => Ok(FieldType::String),
            "integer" => Ok(FieldType::Integer),
            "number" => Ok(FieldType::Number),
            "boolean" => Ok(FieldType::Boolean),
            "null" | "any" => Ok(FieldType::Any),
            "array" => match object.get("items") {
                Some(items @ (Value::Object(_) | Value::Bool(_))) => {
                    let item_pointer = format!("{}/items", pointer);
                    let item = self.resolve_type(items, &item_pointer, &singular(hint), nested)?;
                    Ok(FieldType::Array(Box::new(item)))
                }
                _ => Ok(FieldType::Array(Box::new(FieldType::Any))),
            },
            "object" => {
                if let Some(name) = self.refs.get(pointer) {
                    return Ok(FieldType::Object {
                        name: name.clone(),
                        boxed: self.in_progress.contains(pointer),
                    });
                }
                if object.get("properties").is_some_and(Value::is_object) {
                    let name = self.names.allocate(hint);
                    let model = self.build_object(name.clone(), node, pointer)?;
                    nested.push(model);
                    return Ok(FieldType::Object { name, boxed: false });
                }
                let value = match object.get("additionalProperties") {
                    Some(schema @ Value::Object(_)) => {
                        let sub_pointer = format!("{}/additionalProperties", pointer);
                        let hint = format!("{}Value", hint);
                        self.resolve_type(schema, &sub_pointer, &hint, nested)?
                    }
                    _ => FieldType::Any,
                };
                Ok(FieldType::Map(Box::new(value)))
            }
            other => Err(self.error(pointer, format!("unsupported type '{}'", other))),
        }
    }

    fn resolve_ref(
        &mut self,
        reference: &str,
        pointer: &str,
        nested: &mut Vec<TypeModel>,
    ) -> AppResult<FieldType> {
        let Some(target_pointer) = refs::local_pointer(reference, self.self_id.as_deref()) else {
            return Err(self.error(
                pointer,
                format!("external reference '{}' is not supported", reference),
            ));
        };

        if let Some(name) = self.refs.get(&target_pointer) {
            return Ok(FieldType::Object {
                name: name.clone(),
                boxed: self.in_progress.contains(&target_pointer),
            });
        }

        let document = self.document;
        let Some(target) = document.pointer(&target_pointer) else {
            return Err(self.error(pointer, format!("dangling reference '{}'", reference)));
        };
        let hint = refs::pointer_name(&target_pointer).unwrap_or_else(|| self.schema.to_string());

        if is_struct_like(target) {
            let name = self.names.allocate(&hint);
            let model = self.build_object(name.clone(), target, &target_pointer)?;
            nested.push(model);
            return Ok(FieldType::Object { name, boxed: false });
        }

        if !self.aliases.insert(target_pointer.clone()) {
            return Err(self.error(
                pointer,
                format!("reference cycle through '{}' never reaches an object", reference),
            ));
        }
        let resolved = self.resolve_type(target, &target_pointer, &hint, nested);
        self.aliases.remove(&target_pointer);
        resolved
    }
}

fn declared_type(object: &Map<String, Value>) -> Option<String> {
    match object.get("type")? {
        Value::String(kind) => Some(kind.clone()),
        Value::Array(kinds) => {
            let concrete: Vec<&str> = kinds
                .iter()
                .filter_map(Value::as_str)
                .filter(|k| *k != "null")
                .collect();
            match concrete.as_slice() {
                [single] => Some(single.to_string()),
                _ => Some(concrete.join("|")),
            }
        }
        _ => None,
    }
}

fn inferred_type(object: &Map<String, Value>) -> &'static str {
    if object.contains_key("properties") {
        return "object";
    }
    if object.contains_key("items") {
        return "array";
    }
    let sample = object
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|values| values.first())
        .or_else(|| object.get("const"));
    match sample {
        Some(Value::String(_)) => "string",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => "integer",
        Some(Value::Number(_)) => "number",
        _ => "any",
    }
}

fn is_struct_like(node: &Value) -> bool {
    let Some(object) = node.as_object() else {
        return false;
    };
    object.get("properties").is_some_and(Value::is_object)
        && declared_type(object).map_or(true, |kind| kind == "object")
}

fn is_nullable(node: &Value) -> bool {
    let typed_null = node
        .get("type")
        .and_then(Value::as_array)
        .is_some_and(|kinds| kinds.iter().any(|k| k == "null"));
    typed_null || node.get("nullable").and_then(Value::as_bool) == Some(true)
}

fn description(node: &Value) -> Option<String> {
    node.get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn schema(name: &str, content: &str) -> Schema {
        Schema {
            name: name.to_string(),
            origin: PathBuf::from(format!("schemas/{}.json", name)),
            content: content.as_bytes().to_vec(),
        }
    }

    fn scan_builder() -> TypeModelBuilder {
        TypeModelBuilder::new("models", RootNaming::FromSchemaName)
    }

    fn field<'m>(model: &'m TypeModel, property: &str) -> &'m Field {
        model
            .fields
            .iter()
            .find(|f| f.property == property)
            .unwrap_or_else(|| panic!("no field {}", property))
    }

    #[test]
    fn test_employee() {
        let employee = schema(
            "employee",
            r#"{
                "type": "object",
                "description": "An employee",
                "properties": {
                    "name": { "type": "string" },
                    "age": { "type": "integer" }
                },
                "required": ["name"]
            }"#,
        );
        let model = scan_builder().build(&employee).unwrap();
        assert_eq!(model.name, "Employee");
        assert_eq!(model.qualified_name(), "models.Employee");
        assert_eq!(model.description.as_deref(), Some("An employee"));

        let idents: Vec<&str> = model.fields.iter().map(|f| f.ident.as_str()).collect();
        assert_eq!(idents, vec!["name", "age"]);
        assert_eq!(field(&model, "name").ty, FieldType::String);
        assert!(field(&model, "name").required);
        assert_eq!(field(&model, "age").ty, FieldType::Integer);
        assert!(!field(&model, "age").required);
        assert!(model.nested.is_empty());
        assert!(model.options.builders);
    }

    #[test]
    fn test_root_helper_wraps_schema_named_root() {
        let builder = TypeModelBuilder::new("models", RootNaming::FromSchemaName)
            .with_root_helper(Some("RootClass".into()));
        let model = builder
            .build(&schema(
                "employee",
                r#"{"properties": {"name": {"type": "string"}}}"#,
            ))
            .unwrap();

        assert_eq!(model.name, "RootClass");
        assert_eq!(
            field(&model, "root").ty,
            FieldType::Object {
                name: "Employee".into(),
                boxed: false
            }
        );
        let employee = model.find("Employee").unwrap();
        assert_eq!(employee.fields.len(), 1);
        assert_eq!(field(employee, "name").ty, FieldType::String);
    }

    #[test]
    fn test_root_helper_name_wins_over_schema_name() {
        let builder = TypeModelBuilder::new("models", RootNaming::FromSchemaName)
            .with_root_helper(Some("RootClass".into()));
        let model = builder
            .build(&schema("root_class", r#"{"type": "object"}"#))
            .unwrap();
        assert_eq!(model.name, "RootClass");
        assert_eq!(model.nested[0].name, "RootClass2");
    }

    #[test]
    fn test_fixed_root_name() {
        let builder = TypeModelBuilder::new("models", RootNaming::Fixed("RootClass".into()));
        let model = builder.build(&schema("employee", r#"{"type":"object"}"#)).unwrap();
        assert_eq!(model.name, "RootClass");
    }

    #[test]
    fn test_nullable_is_never_required() {
        let model = scan_builder()
            .build(&schema(
                "person",
                r#"{
                    "properties": {
                        "nick": { "type": ["string", "null"] },
                        "email": { "type": "string", "nullable": true }
                    },
                    "required": ["nick", "email"]
                }"#,
            ))
            .unwrap();
        assert_eq!(field(&model, "nick").ty, FieldType::String);
        assert!(!field(&model, "nick").required);
        assert!(!field(&model, "email").required);
    }

    #[test]
    fn test_inline_objects_and_arrays_become_nested_types() {
        let model = scan_builder()
            .build(&schema(
                "company",
                r#"{
                    "properties": {
                        "headquarters": {
                            "type": "object",
                            "properties": { "city": { "type": "string" } }
                        },
                        "addresses": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": { "street": { "type": "string" } }
                            }
                        },
                        "tags": { "type": "array", "items": { "type": "string" } },
                        "extra": { "type": "array" }
                    }
                }"#,
            ))
            .unwrap();

        let names: Vec<&str> = model.walk().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Company", "Headquarters", "Address"]);
        assert_eq!(
            field(&model, "addresses").ty,
            FieldType::Array(Box::new(FieldType::Object {
                name: "Address".into(),
                boxed: false
            }))
        );
        assert_eq!(
            field(&model, "tags").ty,
            FieldType::Array(Box::new(FieldType::String))
        );
        assert_eq!(
            field(&model, "extra").ty,
            FieldType::Array(Box::new(FieldType::Any))
        );
    }

    #[test]
    fn test_shared_ref_is_generated_once() {
        let model = scan_builder()
            .build(&schema(
                "order",
                r##"{
                    "definitions": {
                        "Address": {
                            "type": "object",
                            "properties": { "street": { "type": "string" } }
                        }
                    },
                    "properties": {
                        "billing": { "$ref": "#/definitions/Address" },
                        "shipping": { "$ref": "#/definitions/Address" }
                    }
                }"##,
            ))
            .unwrap();

        assert_eq!(model.walk().len(), 2);
        let address = FieldType::Object {
            name: "Address".into(),
            boxed: false,
        };
        assert_eq!(field(&model, "billing").ty, address);
        assert_eq!(field(&model, "shipping").ty, address);
    }

    #[test]
    fn test_cycles_are_boxed() {
        let model = scan_builder()
            .build(&schema(
                "tree",
                r##"{
                    "$defs": {
                        "Node": {
                            "type": "object",
                            "properties": {
                                "parent": { "$ref": "#/$defs/Node" },
                                "children": { "type": "array", "items": { "$ref": "#/$defs/Node" } }
                            }
                        }
                    },
                    "properties": {
                        "root": { "$ref": "#/$defs/Node" },
                        "owner": { "$ref": "#" }
                    }
                }"##,
            ))
            .unwrap();

        let node = model.find("Node").unwrap();
        assert_eq!(
            field(node, "parent").ty,
            FieldType::Object {
                name: "Node".into(),
                boxed: true
            }
        );
        assert!(field(node, "parent").is_optional());
        assert_eq!(
            field(&model, "owner").ty,
            FieldType::Object {
                name: "Tree".into(),
                boxed: true
            }
        );
    }

    #[test]
    fn test_alias_refs_resolve_inline() {
        let model = scan_builder()
            .build(&schema(
                "user",
                r##"{
                    "definitions": { "Email": { "type": "string", "format": "email" } },
                    "properties": { "email": { "$ref": "#/definitions/Email" } }
                }"##,
            ))
            .unwrap();
        assert_eq!(field(&model, "email").ty, FieldType::String);
        assert!(model.nested.is_empty());
    }

    #[test]
    fn test_ref_to_own_id() {
        let model = scan_builder()
            .build(&schema(
                "user",
                r##"{
                    "$id": "https://example.com/schemas/user.json",
                    "definitions": {
                        "Role": { "type": "object", "properties": { "title": { "type": "string" } } }
                    },
                    "properties": { "role": { "$ref": "user.json#/definitions/Role" } }
                }"##,
            ))
            .unwrap();
        assert!(model.find("Role").is_some());
    }

    #[test]
    fn test_maps_and_enums() {
        let model = scan_builder()
            .build(&schema(
                "settings",
                r#"{
                    "properties": {
                        "labels": { "type": "object", "additionalProperties": { "type": "string" } },
                        "level": { "enum": [1, 2, 3] },
                        "mode": { "enum": ["fast", "slow"] }
                    },
                    "additionalProperties": true
                }"#,
            ))
            .unwrap();
        assert_eq!(
            field(&model, "labels").ty,
            FieldType::Map(Box::new(FieldType::String))
        );
        assert_eq!(field(&model, "level").ty, FieldType::Integer);
        assert_eq!(field(&model, "mode").ty, FieldType::String);

        let extra = field(&model, "additionalProperties");
        assert_eq!(extra.ident, "additional_properties");
        assert_eq!(extra.ty, FieldType::Map(Box::new(FieldType::Any)));
    }

    #[test]
    fn test_identifiers_are_sanitised() {
        let model = scan_builder()
            .build(&schema(
                "item",
                r#"{
                    "properties": {
                        "type": { "type": "string" },
                        "2fa": { "type": "boolean" },
                        "firstName": { "type": "string" },
                        "first_name": { "type": "string" }
                    }
                }"#,
            ))
            .unwrap();
        let idents: Vec<&str> = model.fields.iter().map(|f| f.ident.as_str()).collect();
        assert_eq!(idents, vec!["type_", "field_2fa", "first_name", "first_name_2"]);
    }

    #[test]
    fn test_malformed_document() {
        let err = scan_builder().build(&schema("broken", "{ not json")).unwrap_err();
        assert!(matches!(err, AppError::SchemaParse { ref name, .. } if name == "broken"));

        let err = scan_builder().build(&schema("list", "[1, 2]")).unwrap_err();
        assert!(format!("{}", err).contains("JSON object"));
    }

    #[test]
    fn test_root_must_be_an_object_type() {
        let err = scan_builder()
            .build(&schema("text", r#"{"type": "string"}"#))
            .unwrap_err();
        assert!(format!("{}", err).contains("expected type 'object'"));
    }

    #[test]
    fn test_unresolvable_references() {
        let external = scan_builder()
            .build(&schema(
                "a",
                r#"{"properties": {"b": {"$ref": "b.json#/definitions/B"}}}"#,
            ))
            .unwrap_err();
        assert!(format!("{}", external).contains("external reference"));

        let dangling = scan_builder()
            .build(&schema(
                "a",
                r##"{"properties": {"b": {"$ref": "#/definitions/Missing"}}}"##,
            ))
            .unwrap_err();
        assert!(format!("{}", dangling).contains("dangling reference"));
        assert!(format!("{}", dangling).contains("#/properties/b"));
    }

    #[test]
    fn test_unsupported_type() {
        let err = scan_builder()
            .build(&schema("a", r#"{"properties": {"when": {"type": "date"}}}"#))
            .unwrap_err();
        assert!(format!("{}", err).contains("unsupported type 'date'"));
    }
}
