use std::collections::HashMap;
use std::fmt;

/// A directory object: a distinguished name plus named, multi-valued
/// attributes. Value order within an attribute is preserved; attributes
/// themselves live in a map with no defined order.
#[derive(Debug, Clone, Default)]
pub struct Entry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

/// A single named attribute with its ordered values, used when building
/// requests attribute by attribute.
#[derive(Debug, Clone)]
pub struct EntryAttribute {
    pub name: String,
    pub values: Vec<String>,
}

impl EntryAttribute {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

impl Entry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Set an attribute. Adding a name that already exists replaces its value
    /// list wholesale; values are never merged. An empty value list is
    /// accepted here and rejected at encode time.
    pub fn add_attribute(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.attributes.insert(name.into(), values);
    }
}

// LDIF-like dump for humans. Not the wire form: no escaping, no canonical
// attribute order.
impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dn: {}", self.dn)?;
        for (name, values) in &self.attributes {
            for value in values {
                writeln!(f, "{}: {}", name, value)?;
            }
        }
        Ok(())
    }
}
