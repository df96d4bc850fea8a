//! Output-schema declarations for structured inference.
//!
//! A [`Schema`] is the provider-neutral description of the JSON document a
//! pipeline expects back. Providers render it into their own dialect (plain
//! JSON Schema for OpenAI-compatible endpoints, Gemini's upper-case type
//! names for the native Gemini API), and the response decoder uses
//! [`Schema::check`] to validate what actually came back, independently of
//! whatever enforcement the remote service claims to do.

use serde_json::{Map, Value, json};

/// A node in an output-schema declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// The node's type and type-specific constraints.
    pub kind: SchemaKind,

    /// Free-form hint forwarded to the inference service.
    pub description: Option<String>,
}

/// The type of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// A JSON object. Properties keep declaration order.
    Object {
        properties: Vec<(String, Schema)>,
        required: Vec<String>,
    },
    /// A homogeneous JSON array.
    Array { items: Box<Schema> },
    /// A string, optionally restricted to a closed set of values.
    String { allowed: Vec<String> },
    /// A real number with optional inclusive bounds.
    Number {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    /// An integral number with an optional inclusive lower bound.
    Integer { minimum: Option<i64> },
    Boolean,
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    /// An object with no properties yet.
    pub fn object() -> Self {
        Self::of(SchemaKind::Object {
            properties: Vec::new(),
            required: Vec::new(),
        })
    }

    pub fn array(items: Schema) -> Self {
        Self::of(SchemaKind::Array {
            items: Box::new(items),
        })
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String {
            allowed: Vec::new(),
        })
    }

    /// A string restricted to the given values.
    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(SchemaKind::String {
            allowed: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number {
            minimum: None,
            maximum: None,
        })
    }

    pub fn integer() -> Self {
        Self::of(SchemaKind::Integer { minimum: None })
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    /// Attach a description.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Restrict a number to `[minimum, maximum]`. No-op on other kinds.
    pub fn range(mut self, min: f64, max: f64) -> Self {
        if let SchemaKind::Number { minimum, maximum } = &mut self.kind {
            *minimum = Some(min);
            *maximum = Some(max);
        }
        self
    }

    /// Add a required property to an object. No-op on other kinds.
    pub fn required(self, name: impl Into<String>, schema: Schema) -> Self {
        self.with_property(name.into(), schema, true)
    }

    /// Add an optional property to an object. No-op on other kinds.
    pub fn optional(self, name: impl Into<String>, schema: Schema) -> Self {
        self.with_property(name.into(), schema, false)
    }

    fn with_property(mut self, name: String, schema: Schema, is_required: bool) -> Self {
        if let SchemaKind::Object {
            properties,
            required,
        } = &mut self.kind
        {
            if is_required {
                required.push(name.clone());
            }
            properties.push((name, schema));
        }
        self
    }

    /// Names of the required properties (empty for non-objects).
    pub fn required_fields(&self) -> &[String] {
        match &self.kind {
            SchemaKind::Object { required, .. } => required,
            _ => &[],
        }
    }

    /// Look up a property declaration by name.
    pub fn property(&self, name: &str) -> Option<&Schema> {
        match &self.kind {
            SchemaKind::Object { properties, .. } => properties
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, schema)| schema),
            _ => None,
        }
    }

    /// The lower-case JSON Schema type name.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            SchemaKind::Object { .. } => "object",
            SchemaKind::Array { .. } => "array",
            SchemaKind::String { .. } => "string",
            SchemaKind::Number { .. } => "number",
            SchemaKind::Integer { .. } => "integer",
            SchemaKind::Boolean => "boolean",
        }
    }

    /// Render as standard JSON Schema.
    ///
    /// Objects are closed (`additionalProperties: false`), which strict
    /// structured-output modes require.
    pub fn to_json_schema(&self) -> Value {
        let mut node = Map::new();
        node.insert("type".into(), json!(self.type_name()));
        if let Some(description) = &self.description {
            node.insert("description".into(), json!(description));
        }

        match &self.kind {
            SchemaKind::Object {
                properties,
                required,
            } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
                    .collect();
                node.insert("properties".into(), Value::Object(props));
                node.insert("required".into(), json!(required));
                node.insert("additionalProperties".into(), json!(false));
            }
            SchemaKind::Array { items } => {
                node.insert("items".into(), items.to_json_schema());
            }
            SchemaKind::String { allowed } if !allowed.is_empty() => {
                node.insert("enum".into(), json!(allowed));
            }
            SchemaKind::Number { minimum, maximum } => {
                if let Some(min) = minimum {
                    node.insert("minimum".into(), json!(min));
                }
                if let Some(max) = maximum {
                    node.insert("maximum".into(), json!(max));
                }
            }
            SchemaKind::Integer { minimum: Some(min) } => {
                node.insert("minimum".into(), json!(min));
            }
            _ => {}
        }

        Value::Object(node)
    }

    /// Validate a JSON value against this declaration.
    ///
    /// Returns every violation found, each prefixed with the path of the
    /// offending node (`$`, `$.topFactors[0].weight`, ...). An empty vector
    /// means the value conforms. Undeclared object keys are tolerated.
    pub fn check(&self, value: &Value) -> Vec<String> {
        let mut violations = Vec::new();
        self.check_at("$", value, &mut violations);
        violations
    }

    fn check_at(&self, path: &str, value: &Value, out: &mut Vec<String>) {
        match (&self.kind, value) {
            (
                SchemaKind::Object {
                    properties,
                    required,
                },
                Value::Object(map),
            ) => {
                for name in required {
                    if !map.contains_key(name) {
                        out.push(format!("{path}.{name}: required field is missing"));
                    }
                }
                for (name, schema) in properties {
                    if let Some(child) = map.get(name) {
                        schema.check_at(&format!("{path}.{name}"), child, out);
                    }
                }
            }
            (SchemaKind::Array { items }, Value::Array(elements)) => {
                for (i, element) in elements.iter().enumerate() {
                    items.check_at(&format!("{path}[{i}]"), element, out);
                }
            }
            (SchemaKind::String { allowed }, Value::String(s)) => {
                if !allowed.is_empty() && !allowed.iter().any(|a| a == s) {
                    out.push(format!(
                        "{path}: \"{s}\" is not one of [{}]",
                        allowed.join(", ")
                    ));
                }
            }
            (SchemaKind::Number { minimum, maximum }, Value::Number(n)) => {
                let Some(v) = n.as_f64() else {
                    out.push(format!("{path}: {n} is not representable as a real number"));
                    return;
                };
                if let Some(min) = minimum {
                    if v < *min {
                        out.push(format!("{path}: {v} is below minimum {min}"));
                    }
                }
                if let Some(max) = maximum {
                    if v > *max {
                        out.push(format!("{path}: {v} is above maximum {max}"));
                    }
                }
            }
            (SchemaKind::Integer { minimum }, Value::Number(n)) => match n.as_i64() {
                Some(v) => {
                    if let Some(min) = minimum {
                        if v < *min {
                            out.push(format!("{path}: {v} is below minimum {min}"));
                        }
                    }
                }
                None if n.is_u64() => {}
                None => out.push(format!("{path}: expected integer, found {n}")),
            },
            (SchemaKind::Boolean, Value::Bool(_)) => {}
            (_, other) => out.push(format!(
                "{path}: expected {}, found {}",
                self.type_name(),
                json_type(other)
            )),
        }
    }
}

/// Semantic checks a decoded value runs after structural validation.
///
/// [`Schema::check`] covers shape, enum membership and declared ranges;
/// `conform` covers what a JSON schema cannot express, such as finiteness of
/// every weight in a list.
pub trait Conform {
    /// Return every violation found; an empty vector means the value is usable.
    fn conform(&self) -> Vec<String> {
        Vec::new()
    }

    /// Findings worth logging that do not make the value unusable.
    fn advisories(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Name of a JSON value's type, for violation messages.
fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
