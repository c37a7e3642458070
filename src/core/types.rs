use std::collections::HashMap;

use super::{AttributeType, Result, StoreError, Value};

/// One stored record: attribute name to value. A missing key means the
/// attribute is absent, which is not the same as `Value::Null`.
pub type Record = HashMap<String, Value>;

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub attr_type: AttributeType,
    pub optional: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            optional: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if !self.attr_type.is_compatible(value) {
            return Err(StoreError::DatabaseCorrupted(format!(
                "Attribute '{}' expects type {}, got {}",
                self.name,
                self.attr_type,
                value.type_name()
            )));
        }
        Ok(())
    }
}

/// The declared shape of one entity within a schema version.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    attributes: Vec<Attribute>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Checks a record against this entity schema: every required attribute
    /// present, every present attribute type-compatible.
    pub fn validate_record(&self, record: &Record) -> Result<()> {
        for attr in &self.attributes {
            match record.get(&attr.name) {
                Some(value) => attr.validate(value)?,
                None => {
                    if !attr.optional {
                        return Err(StoreError::DatabaseCorrupted(format!(
                            "Entity '{}' record is missing required attribute '{}'",
                            self.name, attr.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
