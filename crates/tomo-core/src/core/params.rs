use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParamError {
    #[error("Unknown parameter '{name}' for protocol '{protocol}'")]
    Unknown {
        protocol: &'static str,
        name: String,
    },

    #[error("Parameter '{name}' expects {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("Parameter '{name}' has no choice '{value}'")]
    UnknownChoice { name: String, value: String },

    #[error("Missing value for non-null parameter '{0}'")]
    Missing(String),
}

/// Semantic type of a form parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ParamKind {
    Boolean,
    Integer,
    Float,
    Enum { choices: &'static [&'static str] },
    String,
    Path,
    /// Reference to an object produced by another protocol, identified by its run location.
    Pointer { class: &'static str },
}

impl ParamKind {
    fn expected(&self) -> &'static str {
        match self {
            ParamKind::Boolean => "a boolean",
            ParamKind::Integer => "an integer",
            ParamKind::Float => "a number",
            ParamKind::Enum { .. } => "a choice label or index",
            ParamKind::String => "a string",
            ParamKind::Path => "a path",
            ParamKind::Pointer { .. } => "an object reference",
        }
    }

    /// Checks a value against this kind, normalising integers to floats and enum labels
    /// to their index.
    pub fn coerce(&self, name: &str, value: ParamValue) -> Result<ParamValue, ParamError> {
        let mismatch = |found: &ParamValue| ParamError::TypeMismatch {
            name: name.to_string(),
            expected: self.expected(),
            found: found.to_string(),
        };
        match (self, value) {
            (ParamKind::Boolean, v @ ParamValue::Bool(_)) => Ok(v),
            (ParamKind::Integer, v @ ParamValue::Int(_)) => Ok(v),
            (ParamKind::Float, ParamValue::Int(i)) => Ok(ParamValue::Float(i as f64)),
            (ParamKind::Float, v @ ParamValue::Float(_)) => Ok(v),
            (ParamKind::Enum { choices }, ParamValue::Int(i)) => {
                if i >= 0 && (i as usize) < choices.len() {
                    Ok(ParamValue::Int(i))
                } else {
                    Err(ParamError::UnknownChoice {
                        name: name.to_string(),
                        value: i.to_string(),
                    })
                }
            }
            (ParamKind::Enum { choices }, ParamValue::Text(label)) => choices
                .iter()
                .position(|c| *c == label)
                .map(|i| ParamValue::Int(i as i64))
                .ok_or(ParamError::UnknownChoice {
                    name: name.to_string(),
                    value: label,
                }),
            (ParamKind::String | ParamKind::Path | ParamKind::Pointer { .. }, v @ ParamValue::Text(_)) => {
                Ok(v)
            }
            (_, other) => Err(mismatch(&other)),
        }
    }

    /// Parses a raw command-line string into a value of this kind.
    pub fn parse(&self, name: &str, raw: &str) -> Result<ParamValue, ParamError> {
        let mismatch = || ParamError::TypeMismatch {
            name: name.to_string(),
            expected: self.expected(),
            found: format!("'{}'", raw),
        };
        match self {
            ParamKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(ParamValue::Bool(true)),
                "false" | "no" | "0" => Ok(ParamValue::Bool(false)),
                _ => Err(mismatch()),
            },
            ParamKind::Integer => raw
                .parse::<i64>()
                .map(ParamValue::Int)
                .map_err(|_| mismatch()),
            ParamKind::Float => raw
                .parse::<f64>()
                .map(ParamValue::Float)
                .map_err(|_| mismatch()),
            ParamKind::Enum { choices } => {
                if choices.iter().any(|c| *c == raw) {
                    self.coerce(name, ParamValue::Text(raw.to_string()))
                } else {
                    let index = raw.parse::<i64>().map_err(|_| ParamError::UnknownChoice {
                        name: name.to_string(),
                        value: raw.to_string(),
                    })?;
                    self.coerce(name, ParamValue::Int(index))
                }
            }
            ParamKind::String | ParamKind::Path | ParamKind::Pointer { .. } => {
                Ok(ParamValue::Text(raw.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpertLevel {
    #[default]
    Normal,
    Advanced,
}

/// Applicability of a parameter, evaluated against the current values of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    #[default]
    Always,
    /// Only meaningful when the named boolean parameter is true.
    IfTrue(&'static str),
}

impl Condition {
    pub fn is_met(&self, values: &ParamValues) -> bool {
        match self {
            Condition::Always => true,
            Condition::IfTrue(name) => matches!(values.get(name), Some(ParamValue::Bool(true))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,
    pub allows_null: bool,
    pub important: bool,
    pub expert_level: ExpertLevel,
    pub condition: Condition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl ParamSpec {
    pub fn new(name: &'static str, kind: ParamKind, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind,
            default: None,
            allows_null: true,
            important: false,
            expert_level: ExpertLevel::Normal,
            condition: Condition::Always,
            group: None,
            help: None,
        }
    }

    pub fn boolean(name: &'static str, label: &'static str, default: bool) -> Self {
        Self::new(name, ParamKind::Boolean, label).default(ParamValue::Bool(default))
    }

    pub fn integer(name: &'static str, label: &'static str, default: i64) -> Self {
        Self::new(name, ParamKind::Integer, label).default(ParamValue::Int(default))
    }

    pub fn float(name: &'static str, label: &'static str, default: f64) -> Self {
        Self::new(name, ParamKind::Float, label).default(ParamValue::Float(default))
    }

    pub fn string(name: &'static str, label: &'static str, default: &str) -> Self {
        Self::new(name, ParamKind::String, label).default(ParamValue::Text(default.to_string()))
    }

    pub fn default(mut self, value: ParamValue) -> Self {
        self.default = Some(value);
        self
    }
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
    pub fn required(mut self) -> Self {
        self.allows_null = false;
        self
    }
    pub fn important(mut self) -> Self {
        self.important = true;
        self
    }
    pub fn advanced(mut self) -> Self {
        self.expert_level = ExpertLevel::Advanced;
        self
    }
    pub fn only_if(mut self, governing: &'static str) -> Self {
        self.condition = Condition::IfTrue(governing);
        self
    }
    pub fn in_group(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSection {
    pub label: &'static str,
    pub params: Vec<ParamSpec>,
}

impl FormSection {
    pub fn new(label: &'static str, params: Vec<ParamSpec>) -> Self {
        Self { label, params }
    }
}

/// Declaration of every user-facing option of one protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSchema {
    pub protocol: &'static str,
    pub label: &'static str,
    pub sections: Vec<FormSection>,
}

impl FormSchema {
    pub fn params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.sections.iter().flat_map(|s| s.params.iter())
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params().find(|p| p.name == name)
    }

    pub fn section_of(&self, name: &str) -> Option<&FormSection> {
        self.sections
            .iter()
            .find(|s| s.params.iter().any(|p| p.name == name))
    }

    pub fn is_applicable(&self, name: &str, values: &ParamValues) -> bool {
        self.param(name)
            .is_some_and(|p| p.condition.is_met(values))
    }

    /// Parses `raw` as the value of the named parameter.
    pub fn parse_value(&self, name: &str, raw: &str) -> Result<ParamValue, ParamError> {
        let spec = self.param(name).ok_or_else(|| self.unknown(name))?;
        spec.kind.parse(name, raw)
    }

    /// Type-checks the supplied values, fills in declared defaults and checks that every
    /// applicable non-null parameter ended up with a value.
    pub fn resolve(&self, values: &ParamValues) -> Result<ParamValues, ParamError> {
        let mut resolved = ParamValues::new();
        for (name, value) in values.iter() {
            let spec = self.param(name).ok_or_else(|| self.unknown(name))?;
            resolved.set(spec.name, spec.kind.coerce(name, value.clone())?);
        }
        for spec in self.params() {
            if resolved.get(spec.name).is_none() {
                if let Some(default) = &spec.default {
                    resolved.set(spec.name, default.clone());
                }
            }
        }
        for spec in self.params() {
            if !spec.allows_null
                && spec.condition.is_met(&resolved)
                && resolved.get(spec.name).is_none()
            {
                return Err(ParamError::Missing(spec.name.to_string()));
            }
        }
        Ok(resolved)
    }

    fn unknown(&self, name: &str) -> ParamError {
        ParamError::Unknown {
            protocol: self.protocol,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for FormSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.label, self.protocol)?;
        for section in &self.sections {
            writeln!(f, "\n[{}]", section.label)?;
            for p in &section.params {
                let default = p
                    .default
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let mut notes = Vec::new();
                if !p.allows_null {
                    notes.push("required".to_string());
                }
                if p.expert_level == ExpertLevel::Advanced {
                    notes.push("advanced".to_string());
                }
                if let Condition::IfTrue(governing) = p.condition {
                    notes.push(format!("if {}", governing));
                }
                if let Some(group) = p.group {
                    notes.push(format!("group: {}", group));
                }
                if let ParamKind::Enum { choices } = &p.kind {
                    notes.push(format!("choices: {}", choices.join(", ")));
                }
                write!(f, "  {:<28} {:<10} {}", p.name, default, p.label)?;
                if !notes.is_empty() {
                    write!(f, " ({})", notes.join("; "))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Values of a form keyed by parameter name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamValues(BTreeMap<String, ParamValue>);

impl ParamValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, name: &str) -> Result<&ParamValue, ParamError> {
        self.get(name)
            .ok_or_else(|| ParamError::Missing(name.to_string()))
    }

    fn mismatch(name: &str, expected: &'static str, found: &ParamValue) -> ParamError {
        ParamError::TypeMismatch {
            name: name.to_string(),
            expected,
            found: found.to_string(),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool, ParamError> {
        match self.require(name)? {
            ParamValue::Bool(b) => Ok(*b),
            other => Err(Self::mismatch(name, "a boolean", other)),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64, ParamError> {
        match self.require(name)? {
            ParamValue::Int(i) => Ok(*i),
            other => Err(Self::mismatch(name, "an integer", other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, ParamError> {
        match self.require(name)? {
            ParamValue::Float(x) => Ok(*x),
            ParamValue::Int(i) => Ok(*i as f64),
            other => Err(Self::mismatch(name, "a number", other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, ParamError> {
        match self.require(name)? {
            ParamValue::Text(s) => Ok(s),
            other => Err(Self::mismatch(name, "a string", other)),
        }
    }

    /// Like [`ParamValues::text`], treating an absent or empty string as unset.
    pub fn opt_text(&self, name: &str) -> Result<Option<&str>, ParamError> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Text(s)) if s.is_empty() => Ok(None),
            Some(ParamValue::Text(s)) => Ok(Some(s)),
            Some(other) => Err(Self::mismatch(name, "a string", other)),
        }
    }
}
