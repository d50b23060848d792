//! Typed storage for dialogue variables.

use std::collections::HashMap;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    value::{ValueKind, YarnValue},
};

/// Rust types that can be read back out of a [`VariableStore`].
pub trait VariableType: Sized {
    const KIND: ValueKind;

    fn from_value(value: &YarnValue) -> Option<Self>;
}

impl VariableType for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_value(value: &YarnValue) -> Option<Self> {
        match value {
            YarnValue::Bool(val) => Some(*val),
            _ => None,
        }
    }
}

impl VariableType for f32 {
    const KIND: ValueKind = ValueKind::Number;

    fn from_value(value: &YarnValue) -> Option<Self> {
        match value {
            YarnValue::Number(val) => Some(*val),
            _ => None,
        }
    }
}

impl VariableType for String {
    const KIND: ValueKind = ValueKind::Str;

    fn from_value(value: &YarnValue) -> Option<Self> {
        match value {
            YarnValue::Str(val) => Some(val.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct VariableRecord {
    key: String,
    value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    variables: HashMap<String, YarnValue>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or overwrites a variable. Storing [`YarnValue::Null`] unsets it.
    pub fn set_value(&mut self, name: &str, value: impl Into<YarnValue>) {
        let value = value.into();
        if let YarnValue::Null = value {
            self.variables.remove(name);
            return;
        }

        debug!("Setting {} to {:?}", name, value);
        self.variables.insert(name.to_string(), value);
    }

    /// Reads a variable as `T`.
    ///
    /// Returns `Ok(None)` when the variable was never set, and
    /// [`Error::TypeMismatch`] when it holds a different type.
    pub fn try_get_value<T: VariableType>(&self, name: &str) -> Result<Option<T>> {
        match self.variables.get(name) {
            None => Ok(None),
            Some(value) => {
                T::from_value(value)
                    .map(Some)
                    .ok_or_else(|| Error::TypeMismatch {
                        name: name.to_string(),
                        expected: T::KIND,
                        found: value.kind(),
                    })
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&YarnValue> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<YarnValue> {
        self.variables.remove(name)
    }

    pub fn clear(&mut self) {
        self.variables.clear();
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &YarnValue)> {
        self.variables.iter()
    }

    /// Writes every variable as a CSV record whose key carries the type,
    /// e.g. `number:$gold,12`. Records are sorted by name.
    pub fn serialize_to_text(&self) -> Result<String> {
        let mut names: Vec<&String> = self.variables.keys().collect();
        names.sort();

        let mut writer = csv::Writer::from_writer(Vec::new());
        for name in names {
            let value = &self.variables[name];
            writer.serialize(VariableRecord {
                key: format!("{}:{}", value.kind(), name),
                value: raw_text(value),
            })?;
        }

        let bytes = writer.into_inner()
            .map_err(|err| Error::Io(err.into_error()))?;
        String::from_utf8(bytes)
            .map_err(|err| Error::MalformedVariableData(err.to_string()))
    }

    /// Replaces the store's contents with variables read from text produced
    /// by [`VariableStore::serialize_to_text`].
    ///
    /// Nothing is changed if any record is malformed.
    pub fn deserialize_from_text(&mut self, text: &str) -> Result<()> {
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let mut variables = HashMap::new();

        for record in reader.deserialize() {
            let record: VariableRecord = record?;
            let (name, value) = parse_record(&record)?;
            variables.insert(name, value);
        }

        info!("Loaded {} variables", variables.len());
        self.variables = variables;
        Ok(())
    }
}

fn raw_text(value: &YarnValue) -> String {
    match value {
        YarnValue::Bool(val) => val.to_string(),
        other => other.as_string(),
    }
}

fn parse_record(record: &VariableRecord) -> Result<(String, YarnValue)> {
    let mut split_key = record.key.splitn(2, ':');
    let kind = split_key.next()
        .and_then(ValueKind::from_name);
    let name = split_key.next()
        .filter(|name| !name.is_empty());

    let (kind, name) = match (kind, name) {
        (Some(kind), Some(name)) => (kind, name),
        _ => {
            return Err(Error::MalformedVariableData(format!("bad key {:?}", record.key)));
        }
    };

    let value = match kind {
        ValueKind::Str => YarnValue::Str(record.value.clone()),
        ValueKind::Bool => {
            let val = record.value.parse::<bool>()
                .map_err(|_| Error::MalformedVariableData(format!("{} is not a bool: {:?}", name, record.value)))?;
            YarnValue::Bool(val)
        }
        ValueKind::Number => {
            let val = record.value.parse::<f32>()
                .map_err(|_| Error::MalformedVariableData(format!("{} is not a number: {:?}", name, record.value)))?;
            YarnValue::Number(val)
        }
        ValueKind::Null => {
            return Err(Error::MalformedVariableData(format!("{} cannot be stored as null", name)));
        }
    };

    Ok((name.to_string(), value))
}
