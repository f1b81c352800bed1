use serde_json::{json, Map, Value};

/// Semantic type of a tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    /// Non-empty free text.
    String,
    /// Absolute `http`/`https` URL.
    Url,
    /// One of a fixed set of strings.
    Enum(&'static [&'static str]),
    Boolean,
    /// Integer, optionally bounded (inclusive).
    Number { min: Option<u64>, max: Option<u64> },
    /// Free-form JSON object.
    Object,
    /// JSON object or `null`.
    NullableObject,
}

impl ArgType {
    /// Checks a supplied value against this type. The error is a human-readable reason.
    pub fn check(&self, v: &Value) -> std::result::Result<(), String> {
        match self {
            Self::String => match v.as_str() {
                Some(s) if !s.trim().is_empty() => Ok(()),
                Some(_) => Err("must be a non-empty string".to_string()),
                None => Err(format!("expected a string, got {}", kind_of(v))),
            },
            Self::Url => {
                let s = v
                    .as_str()
                    .ok_or_else(|| format!("expected a URL string, got {}", kind_of(v)))?;
                let u = url::Url::parse(s.trim()).map_err(|e| format!("not a valid URL: {e}"))?;
                match u.scheme() {
                    "http" | "https" if u.host_str().is_some() => Ok(()),
                    "http" | "https" => Err("URL has no host".to_string()),
                    other => Err(format!("unsupported URL scheme `{other}` (use http or https)")),
                }
            }
            Self::Enum(allowed) => {
                let s = v
                    .as_str()
                    .ok_or_else(|| format!("expected a string, got {}", kind_of(v)))?;
                if allowed.contains(&s) {
                    Ok(())
                } else {
                    Err(format!("must be one of: {}", allowed.join(", ")))
                }
            }
            Self::Boolean => match v {
                Value::Bool(_) => Ok(()),
                other => Err(format!("expected a boolean, got {}", kind_of(other))),
            },
            Self::Number { min, max } => {
                let n = integer_of(v)
                    .ok_or_else(|| format!("expected an integer, got {}", kind_of(v)))?;
                if let Some(lo) = min {
                    if n < *lo {
                        return Err(format!("must be >= {lo}"));
                    }
                }
                if let Some(hi) = max {
                    if n > *hi {
                        return Err(format!("must be <= {hi}"));
                    }
                }
                Ok(())
            }
            Self::Object => match v {
                Value::Object(_) => Ok(()),
                other => Err(format!("expected an object, got {}", kind_of(other))),
            },
            Self::NullableObject => match v {
                Value::Object(_) | Value::Null => Ok(()),
                other => Err(format!("expected an object or null, got {}", kind_of(other))),
            },
        }
    }

    fn json_schema(&self) -> Map<String, Value> {
        let v = match self {
            Self::String => json!({ "type": "string", "minLength": 1 }),
            Self::Url => json!({ "type": "string", "format": "uri" }),
            Self::Enum(allowed) => json!({ "type": "string", "enum": allowed }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Number { min, max } => {
                let mut m = json!({ "type": "integer" });
                if let Some(lo) = min {
                    m["minimum"] = json!(lo);
                }
                if let Some(hi) = max {
                    m["maximum"] = json!(hi);
                }
                m
            }
            Self::Object => json!({ "type": "object" }),
            Self::NullableObject => json!({ "type": ["object", "null"] }),
        };
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }
}

/// Accepts JSON integers, and floats with no fractional part (`10.0`).
pub(crate) fn integer_of(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    let f = v.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

pub(crate) fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    pub name: &'static str,
    pub ty: ArgType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
    /// Names this field carried in earlier revisions. They are recognized only to be
    /// rejected with a pointer to `name`.
    pub renamed_from: &'static [&'static str],
    /// Values advertised as the schema's `enum` without being enforced by `ty`.
    pub suggested: &'static [&'static str],
}

impl ArgumentSpec {
    pub fn required(name: &'static str, ty: ArgType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: true,
            default: None,
            description,
            renamed_from: &[],
            suggested: &[],
        }
    }

    pub fn optional(name: &'static str, ty: ArgType, description: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty, description)
        }
    }

    pub fn with_default(mut self, v: Value) -> Self {
        self.default = Some(v);
        self
    }

    pub fn renamed_from(mut self, legacy: &'static [&'static str]) -> Self {
        self.renamed_from = legacy;
        self
    }

    /// Lists accepted values in the input schema while leaving the check to dispatch.
    pub fn suggest(mut self, values: &'static [&'static str]) -> Self {
        self.suggested = values;
        self
    }

    /// A declared default must satisfy the argument's own type and constraints.
    pub(crate) fn check_default(&self) -> std::result::Result<(), String> {
        match &self.default {
            Some(d) => self
                .ty
                .check(d)
                .map_err(|r| format!("default for `{}` {r}", self.name)),
            None => Ok(()),
        }
    }

    fn json_schema(&self) -> Value {
        let mut m = self.ty.json_schema();
        if !self.description.is_empty() {
            m.insert("description".to_string(), json!(self.description));
        }
        if let Some(d) = &self.default {
            m.insert("default".to_string(), d.clone());
        }
        if !self.suggested.is_empty() {
            m.insert("enum".to_string(), json!(self.suggested));
        }
        Value::Object(m)
    }
}

/// A registered tool: its name, description and ordered argument specs.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub args: Vec<ArgumentSpec>,
}

impl ToolDefinition {
    pub fn arg(&self, name: &str) -> Option<&ArgumentSpec> {
        self.args.iter().find(|a| a.name == name)
    }

    /// The canonical field a legacy name was renamed to, if any.
    pub fn renamed(&self, legacy: &str) -> Option<&'static str> {
        self.args
            .iter()
            .find(|a| a.renamed_from.contains(&legacy))
            .map(|a| a.name)
    }

    /// JSON Schema (draft 2020-12 subset) describing the accepted arguments.
    pub fn input_schema(&self) -> Map<String, Value> {
        let mut props = Map::new();
        let mut required = Vec::new();
        for a in &self.args {
            props.insert(a.name.to_string(), a.json_schema());
            if a.required {
                required.push(json!(a.name));
            }
        }
        let mut m = Map::new();
        m.insert("type".to_string(), json!("object"));
        m.insert("properties".to_string(), Value::Object(props));
        m.insert("required".to_string(), Value::Array(required));
        m.insert("additionalProperties".to_string(), json!(false));
        m
    }
}
