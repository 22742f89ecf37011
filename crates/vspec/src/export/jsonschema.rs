//! JSON Schema back-end
//!
//! Branches become `object` schemas with their children under `properties`;
//! leaves become typed schemas carrying `description`, `minimum`/`maximum`,
//! and `enum` (from `allowed`). Struct datatypes land in `definitions` and
//! are referenced with `$ref`.

use super::{Artifact, Exporter, ExporterContext};
use crate::error::{CompileError, Result};
use serde_json::{Map, Value, json};
use std::path::Path;
use vspec_model::{Datatype, Node, Primitive, ScalarValue, StructDef};

/// Render the tree as a JSON Schema document
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaExporter;

impl Exporter for JsonSchemaExporter {
    fn format(&self) -> &'static str {
        "jsonschema"
    }

    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>> {
        let mut doc = Map::new();
        doc.insert(
            "$schema".to_string(),
            json!("http://json-schema.org/draft-07/schema#"),
        );
        doc.insert("title".to_string(), json!(context.tree.name.as_str()));
        doc.insert("type".to_string(), json!("object"));
        doc.insert(
            "properties".to_string(),
            json!({ context.tree.name.as_str(): node_schema(context.tree) }),
        );

        if !context.types.is_empty() {
            let mut definitions = Map::new();
            for def in context.types.iter() {
                definitions.insert(def.fqn.to_string(), struct_schema(def));
            }
            doc.insert("definitions".to_string(), Value::Object(definitions));
        }

        let bytes = serde_json::to_vec_pretty(&Value::Object(doc))
            .map_err(|e| CompileError::io(std::io::Error::other(e), output))?;
        Ok(vec![Artifact::new(output, bytes)])
    }
}

fn node_schema(node: &Node) -> Value {
    let mut schema = Map::new();
    if let Some(description) = &node.description {
        schema.insert("description".to_string(), json!(description));
    }
    match node.signal().and_then(|s| s.datatype.as_ref()) {
        Some(datatype) => {
            extend_with_datatype(&mut schema, datatype);
            let signal = node.signal().unwrap();
            if let Some(min) = &signal.min {
                schema.insert("minimum".to_string(), scalar_json(min));
            }
            if let Some(max) = &signal.max {
                schema.insert("maximum".to_string(), scalar_json(max));
            }
            if !signal.allowed.is_empty() {
                schema.insert(
                    "enum".to_string(),
                    Value::Array(signal.allowed.iter().map(scalar_json).collect()),
                );
            }
        }
        None => {
            schema.insert("type".to_string(), json!("object"));
            let mut properties = Map::new();
            for child in &node.children {
                properties.insert(child.name.to_string(), node_schema(child));
            }
            schema.insert("properties".to_string(), Value::Object(properties));
        }
    }
    Value::Object(schema)
}

fn struct_schema(def: &StructDef) -> Value {
    let mut properties = Map::new();
    for property in &def.properties {
        let mut schema = Map::new();
        if let Some(description) = &property.description {
            schema.insert("description".to_string(), json!(description));
        }
        extend_with_datatype(&mut schema, &property.datatype);
        properties.insert(property.name.to_string(), Value::Object(schema));
    }
    let mut schema = Map::new();
    if let Some(description) = &def.description {
        schema.insert("description".to_string(), json!(description));
    }
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    Value::Object(schema)
}

fn extend_with_datatype(schema: &mut Map<String, Value>, datatype: &Datatype) {
    let item = match datatype.primitive() {
        Some(primitive) => {
            let mut item = Map::new();
            item.insert("type".to_string(), json!(scalar(primitive)));
            item
        }
        None => {
            let mut item = Map::new();
            item.insert(
                "$ref".to_string(),
                json!(format!(
                    "#/definitions/{}",
                    datatype.struct_fqn().unwrap_or_default()
                )),
            );
            item
        }
    };
    if datatype.is_array() {
        schema.insert("type".to_string(), json!("array"));
        schema.insert("items".to_string(), Value::Object(item));
        if let Some(size) = datatype.arraysize() {
            schema.insert("minItems".to_string(), json!(size));
            schema.insert("maxItems".to_string(), json!(size));
        }
    } else {
        schema.extend(item);
    }
}

fn scalar(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Float | Primitive::Double => "number",
        Primitive::Boolean => "boolean",
        Primitive::String => "string",
        _ => "integer",
    }
}

fn scalar_json(value: &ScalarValue) -> Value {
    match value {
        ScalarValue::Bool(b) => json!(b),
        ScalarValue::Int(i) => json!(i),
        ScalarValue::Float(f) => json!(f),
        ScalarValue::String(s) => json!(s),
    }
}
