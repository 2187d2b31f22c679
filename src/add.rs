use std::fmt;

use crate::ber::{BerClass, BerNode, TAG_SEQUENCE, TAG_SET};
use crate::control::Control;
use crate::entry::{Entry, EntryAttribute};
use crate::error::LdapError;

/// [APPLICATION 8] tag distinguishing AddRequest from the other operations
/// sharing the LDAPMessage envelope.
pub const APPLICATION_ADD_REQUEST: u32 = 8;

/// An Add operation: the entry to create plus any controls. Encoding is
/// read-only and idempotent; the request can be encoded any number of times.
#[derive(Debug, Clone)]
pub struct AddRequest {
    pub entry: Entry,
    pub controls: Vec<Control>,
}

impl AddRequest {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            entry: Entry::new(dn),
            controls: Vec::new(),
        }
    }

    pub fn from_entry(entry: Entry) -> Self {
        Self {
            entry,
            controls: Vec::new(),
        }
    }

    /// Set one attribute on the entry, replacing any existing value list for
    /// the same name.
    pub fn add_attribute(&mut self, attribute: EntryAttribute) {
        self.entry.add_attribute(attribute.name, attribute.values);
    }

    pub fn add_attributes(&mut self, attributes: Vec<EntryAttribute>) {
        for attribute in attributes {
            self.add_attribute(attribute);
        }
    }

    pub fn add_control(&mut self, control: Control) {
        self.controls.push(control);
    }

    /// Build the operation node tree:
    ///
    /// ```text
    /// AddRequest ::= [APPLICATION 8] SEQUENCE {
    ///      entry           LDAPDN,
    ///      attributes      AttributeList }
    ///
    /// AttributeList ::= SEQUENCE OF attribute Attribute
    ///
    /// Attribute ::= SEQUENCE {
    ///      type       AttributeDescription,
    ///      vals       SET OF value AttributeValue }  -- vals is not empty
    /// ```
    ///
    /// Attribute names are sorted lexically so the output is stable across
    /// calls; value order within each attribute is kept as stored. Any
    /// attribute with an empty value list aborts the whole encode.
    pub fn encode(&self) -> Result<BerNode, LdapError> {
        let mut add = BerNode::constructed(
            BerClass::Application,
            APPLICATION_ADD_REQUEST,
            "Add Request",
        );
        add.append_child(BerNode::octet_string(&self.entry.dn, "LDAP DN"));

        let mut attribute_list =
            BerNode::constructed(BerClass::Universal, TAG_SEQUENCE, "Attribute List");

        let mut names: Vec<&String> = self.entry.attributes.keys().collect();
        names.sort();
        for name in names {
            let values = &self.entry.attributes[name];
            if values.is_empty() {
                return Err(LdapError::Encoding {
                    attribute: name.clone(),
                });
            }
            let mut attribute =
                BerNode::constructed(BerClass::Universal, TAG_SEQUENCE, "Attribute");
            attribute.append_child(BerNode::octet_string(name, "Attribute Desc"));
            let mut value_set =
                BerNode::constructed(BerClass::Universal, TAG_SET, "Attribute Value Set");
            for value in values {
                value_set.append_child(BerNode::octet_string(value, "Attribute Value"));
            }
            attribute.append_child(value_set);
            attribute_list.append_child(attribute);
        }

        add.append_child(attribute_list);
        Ok(add)
    }

    /// Serialize straight to wire bytes, discarding the node tree. Returns
    /// the encode error unchanged; no bytes are ever produced on failure.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LdapError> {
        Ok(self.encode()?.to_bytes())
    }
}

// LDIF-like dump for testing and logs, terminated by a blank line. Never the
// wire form and never fails, even when encode would.
impl fmt::Display for AddRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entry)?;
        writeln!(f)
    }
}
