use crate::ber::{BerClass, BerNode, TAG_SEQUENCE};

/// Context [0] IMPLICIT SEQUENCE OF Control attached to the message envelope.
const CONTEXT_CONTROLS: u32 = 0;

/// An LDAP control (RFC 4511 §4.1.11): a protocol extension identified by
/// OID, opaque to this client beyond its encoding.
#[derive(Debug, Clone)]
pub struct Control {
    pub oid: String,
    pub critical: bool,
    pub value: Option<Vec<u8>>,
}

impl Control {
    pub fn new(oid: impl Into<String>, critical: bool, value: Option<Vec<u8>>) -> Self {
        Self {
            oid: oid.into(),
            critical,
            value,
        }
    }

    /// Control ::= SEQUENCE { controlType, criticality DEFAULT FALSE,
    /// controlValue OPTIONAL }. A false criticality is omitted, being the
    /// default.
    pub(crate) fn to_node(&self) -> BerNode {
        let mut node = BerNode::constructed(BerClass::Universal, TAG_SEQUENCE, "Control");
        node.append_child(BerNode::octet_string(&self.oid, "Control Type"));
        if self.critical {
            node.append_child(BerNode::boolean(true, "Criticality"));
        }
        if let Some(value) = &self.value {
            node.append_child(BerNode::primitive(
                BerClass::Universal,
                crate::ber::TAG_OCTET_STRING,
                value.clone(),
                "Control Value",
            ));
        }
        node
    }
}

/// Wrap controls in the [0] container appended after the protocol op.
pub(crate) fn encode_controls(controls: &[Control]) -> BerNode {
    let mut node = BerNode::constructed(BerClass::ContextSpecific, CONTEXT_CONTROLS, "Controls");
    for control in controls {
        node.append_child(control.to_node());
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::reader::BerReader;

    #[test]
    fn non_critical_control_omits_criticality() {
        let control = Control::new("1.2.840.113556.1.4.805", false, None);
        let bytes = control.to_node().to_bytes();
        let mut reader = BerReader::new(&bytes);
        let len = reader.expect_constructed(0x30).unwrap();
        assert_eq!(len, reader.remaining());
        assert_eq!(reader.read_string().unwrap(), "1.2.840.113556.1.4.805");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn critical_control_with_value() {
        let control = Control::new("1.2.3.4", true, Some(vec![0x30, 0x00]));
        let bytes = control.to_node().to_bytes();
        let mut reader = BerReader::new(&bytes);
        reader.expect_constructed(0x30).unwrap();
        assert_eq!(reader.read_string().unwrap(), "1.2.3.4");
        assert_eq!(reader.read_tag().unwrap(), 0x01);
        assert_eq!(reader.read_length().unwrap(), 1);
        // remaining: criticality octet then the value TLV
        assert_eq!(reader.remaining(), 1 + 4);
    }

    #[test]
    fn controls_wrapper_uses_context_zero() {
        let controls = vec![Control::new("1.2.3.4", false, None)];
        let bytes = encode_controls(&controls).to_bytes();
        assert_eq!(bytes[0], 0xA0);
    }
}
