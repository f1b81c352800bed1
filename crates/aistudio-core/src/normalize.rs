use crate::spec::{integer_of, ArgType, ToolDefinition};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Arguments after validation and defaulting.
///
/// Every required field of the tool is present and type-correct; optional fields carry
/// their declared default when the caller left them out.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedArguments {
    tool: String,
    values: BTreeMap<String, Value>,
}

impl NormalizedArguments {
    /// Canonical tool name (aliases already resolved).
    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    pub fn number(&self, name: &str) -> Option<u64> {
        self.values.get(name).and_then(integer_of)
    }

    /// A present, non-null object value.
    pub fn object(&self, name: &str) -> Option<&Map<String, Value>> {
        self.values.get(name).and_then(Value::as_object)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Validates `raw` against `def` and fills in declared defaults.
pub fn normalize(def: &ToolDefinition, raw: &Map<String, Value>) -> Result<NormalizedArguments> {
    for key in raw.keys() {
        if def.arg(key).is_some() {
            continue;
        }
        if let Some(canonical) = def.renamed(key) {
            return Err(Error::validation(
                key.as_str(),
                format!("`{key}` was renamed; pass `{canonical}` instead"),
            ));
        }
        return Err(Error::validation(
            key.as_str(),
            format!("unrecognized argument for {}", def.name),
        ));
    }

    let mut values = BTreeMap::new();
    for spec in &def.args {
        let supplied = match raw.get(spec.name) {
            Some(Value::Null) if spec.ty != ArgType::NullableObject => None,
            other => other,
        };
        match supplied {
            Some(v) => {
                spec.ty
                    .check(v)
                    .map_err(|reason| Error::validation(spec.name, reason))?;
                values.insert(spec.name.to_string(), canonical_value(spec.ty, v));
            }
            None if spec.required => {
                return Err(Error::validation(spec.name, "is required"));
            }
            None => {
                if let Some(d) = &spec.default {
                    values.insert(spec.name.to_string(), d.clone());
                }
            }
        }
    }

    Ok(NormalizedArguments {
        tool: def.name.clone(),
        values,
    })
}

fn canonical_value(ty: ArgType, v: &Value) -> Value {
    match ty {
        ArgType::Url => Value::String(v.as_str().unwrap_or_default().trim().to_string()),
        // `10.0` and `10` mean the same thing; forward the integer form.
        ArgType::Number { .. } => integer_of(v).map(Value::from).unwrap_or_else(|| v.clone()),
        _ => v.clone(),
    }
}
