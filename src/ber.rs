// BER (ITU-T X.690) encoding for LDAP v3 protocol structures.
// Nodes are built bottom-up into a tree, then serialized in one pass:
// identifier octet(s), definite length (short or long form), payload.

/// Tag class, the top two bits of the identifier octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BerClass {
    Universal = 0x00,
    Application = 0x40,
    ContextSpecific = 0x80,
    Private = 0xC0,
}

/// Primitive nodes carry a final payload; constructed nodes carry children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BerType {
    Primitive = 0x00,
    Constructed = 0x20,
}

pub const TAG_BOOLEAN: u32 = 0x01;
pub const TAG_INTEGER: u32 = 0x02;
pub const TAG_OCTET_STRING: u32 = 0x04;
pub const TAG_ENUMERATED: u32 = 0x0A;
pub const TAG_SEQUENCE: u32 = 0x10;
pub const TAG_SET: u32 = 0x11;

/// One node of a BER tree. Append order of children is preserved and
/// determines field order on the wire. The description is for diagnostics
/// only and never reaches the wire.
#[derive(Debug, Clone)]
pub struct BerNode {
    class: BerClass,
    ber_type: BerType,
    tag: u32,
    payload: Vec<u8>,
    children: Vec<BerNode>,
    description: &'static str,
}

impl BerNode {
    /// Empty constructed container. Children are added with `append_child`.
    pub fn constructed(class: BerClass, tag: u32, description: &'static str) -> Self {
        Self {
            class,
            ber_type: BerType::Constructed,
            tag,
            payload: Vec::new(),
            children: Vec::new(),
            description,
        }
    }

    /// Primitive node with an arbitrary byte payload.
    pub fn primitive(class: BerClass, tag: u32, payload: Vec<u8>, description: &'static str) -> Self {
        Self {
            class,
            ber_type: BerType::Primitive,
            tag,
            payload,
            children: Vec::new(),
            description,
        }
    }

    /// Universal OCTET STRING carrying the raw bytes of `value`. LDAP encodes
    /// all of its textual fields (DNs, attribute names, values) this way,
    /// with no additional escaping.
    pub fn octet_string(value: &str, description: &'static str) -> Self {
        Self::primitive(
            BerClass::Universal,
            TAG_OCTET_STRING,
            value.as_bytes().to_vec(),
            description,
        )
    }

    /// Universal INTEGER, minimal two's-complement content octets.
    pub fn integer(value: i64, description: &'static str) -> Self {
        let mut bytes = value.to_be_bytes().to_vec();
        while bytes.len() > 1 {
            if (bytes[0] == 0x00 && bytes[1] & 0x80 == 0)
                || (bytes[0] == 0xFF && bytes[1] & 0x80 != 0)
            {
                bytes.remove(0);
            } else {
                break;
            }
        }
        Self::primitive(BerClass::Universal, TAG_INTEGER, bytes, description)
    }

    /// Universal BOOLEAN. True is 0xFF per the DER convention; any non-zero
    /// octet is accepted by peers.
    pub fn boolean(value: bool, description: &'static str) -> Self {
        let octet = if value { 0xFF } else { 0x00 };
        Self::primitive(BerClass::Universal, TAG_BOOLEAN, vec![octet], description)
    }

    /// Append a child to a constructed node. Order is significant. Appending
    /// to a primitive node is a bug in the caller and will panic.
    pub fn append_child(&mut self, child: BerNode) {
        assert!(
            self.ber_type == BerType::Constructed,
            "cannot append child to primitive node {:?}",
            self.description
        );
        self.children.push(child);
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Serialize the whole tree. Children are serialized first so that each
    /// length field covers the exact byte count of its payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = match self.ber_type {
            BerType::Primitive => self.payload.clone(),
            BerType::Constructed => {
                let mut buf = Vec::new();
                for child in &self.children {
                    buf.extend_from_slice(&child.to_bytes());
                }
                buf
            }
        };
        let mut out = Vec::with_capacity(payload.len() + 6);
        write_identifier(&mut out, self.class, self.ber_type, self.tag);
        write_length(&mut out, payload.len());
        out.extend_from_slice(&payload);
        out
    }
}

/// Identifier octet(s): class (2 bits) + primitive/constructed (1 bit) +
/// tag. Tags below 31 fit in the first octet; larger tags use the
/// high-tag-number form, base-128 with a continuation bit.
fn write_identifier(buf: &mut Vec<u8>, class: BerClass, ber_type: BerType, tag: u32) {
    let leading = class as u8 | ber_type as u8;
    if tag < 0x1F {
        buf.push(leading | tag as u8);
        return;
    }
    buf.push(leading | 0x1F);
    let mut shift = (31 - tag.leading_zeros()) / 7 * 7;
    while shift > 0 {
        buf.push(0x80 | ((tag >> shift) & 0x7F) as u8);
        shift -= 7;
    }
    buf.push((tag & 0x7F) as u8);
}

/// Definite length: single octet for lengths up to 127, otherwise one octet
/// giving the number of length octets (high bit set) followed by the length
/// big-endian in as few octets as possible.
fn write_length(buf: &mut Vec<u8>, length: usize) {
    if length < 128 {
        buf.push(length as u8);
        return;
    }
    let mut bytes = Vec::new();
    let mut len = length;
    while len > 0 {
        bytes.push((len & 0xFF) as u8);
        len >>= 8;
    }
    bytes.reverse();
    buf.push(0x80 | bytes.len() as u8);
    buf.extend_from_slice(&bytes);
}


#[cfg(test)]
mod tests {
    use super::reader::BerReader;
    use super::*;

    #[test]
    fn octet_string_identifier_and_length() {
        let node = BerNode::octet_string("hello", "greeting");
        let bytes = node.to_bytes();
        assert_eq!(bytes, vec![0x04, 0x05, b'h', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn empty_octet_string() {
        let node = BerNode::octet_string("", "empty");
        assert_eq!(node.to_bytes(), vec![0x04, 0x00]);
    }

    #[test]
    fn integer_minimal_content_octets() {
        assert_eq!(BerNode::integer(0, "").to_bytes(), vec![0x02, 0x01, 0x00]);
        assert_eq!(BerNode::integer(127, "").to_bytes(), vec![0x02, 0x01, 0x7F]);
        // 128 needs a leading 0x00 so it is not read as negative
        assert_eq!(
            BerNode::integer(128, "").to_bytes(),
            vec![0x02, 0x02, 0x00, 0x80]
        );
        assert_eq!(
            BerNode::integer(256, "").to_bytes(),
            vec![0x02, 0x02, 0x01, 0x00]
        );
        assert_eq!(BerNode::integer(-1, "").to_bytes(), vec![0x02, 0x01, 0xFF]);
        assert_eq!(
            BerNode::integer(-129, "").to_bytes(),
            vec![0x02, 0x02, 0xFF, 0x7F]
        );
    }

    #[test]
    fn integer_round_trips_through_reader() {
        for value in [0i64, 1, 42, 127, 128, 255, 65535, i32::MAX as i64, -1, -128] {
            let bytes = BerNode::integer(value, "").to_bytes();
            let mut reader = BerReader::new(&bytes);
            assert_eq!(reader.read_integer().unwrap(), value);
        }
    }

    #[test]
    fn boolean_encoding() {
        assert_eq!(BerNode::boolean(true, "").to_bytes(), vec![0x01, 0x01, 0xFF]);
        assert_eq!(
            BerNode::boolean(false, "").to_bytes(),
            vec![0x01, 0x01, 0x00]
        );
    }

    #[test]
    fn constructed_length_covers_children_exactly() {
        let mut seq = BerNode::constructed(BerClass::Universal, TAG_SEQUENCE, "seq");
        seq.append_child(BerNode::octet_string("ab", "first"));
        seq.append_child(BerNode::octet_string("cd", "second"));
        let bytes = seq.to_bytes();
        // identifier 0x30, length 8, two 4-byte children in append order
        assert_eq!(bytes[0], 0x30);
        assert_eq!(bytes[1] as usize, bytes.len() - 2);
        assert_eq!(&bytes[2..6], &[0x04, 0x02, b'a', b'b']);
        assert_eq!(&bytes[6..10], &[0x04, 0x02, b'c', b'd']);
    }

    #[test]
    fn set_container_identifier() {
        let set = BerNode::constructed(BerClass::Universal, TAG_SET, "set");
        assert_eq!(set.to_bytes(), vec![0x31, 0x00]);
    }

    #[test]
    fn application_constructed_identifier() {
        let node = BerNode::constructed(BerClass::Application, 8, "add request");
        assert_eq!(node.to_bytes()[0], 0x68);
    }

    #[test]
    fn long_form_length() {
        let value = "x".repeat(300);
        let node = BerNode::octet_string(&value, "long");
        let bytes = node.to_bytes();
        assert_eq!(bytes[0], 0x04);
        assert_eq!(bytes[1], 0x82); // two length octets
        assert_eq!(bytes[2], 0x01);
        assert_eq!(bytes[3], 0x2C); // 300
        assert_eq!(bytes.len(), 4 + 300);
    }

    #[test]
    fn long_form_length_boundary_128() {
        let node = BerNode::octet_string(&"y".repeat(128), "boundary");
        let bytes = node.to_bytes();
        assert_eq!(&bytes[..3], &[0x04, 0x81, 0x80]);
        assert_eq!(bytes.len(), 3 + 128);
    }

    #[test]
    fn nested_containers_serialize_bottom_up() {
        let mut inner = BerNode::constructed(BerClass::Universal, TAG_SEQUENCE, "inner");
        inner.append_child(BerNode::octet_string(&"v".repeat(200), "fat value"));
        let mut outer = BerNode::constructed(BerClass::Universal, TAG_SEQUENCE, "outer");
        outer.append_child(inner);
        let bytes = outer.to_bytes();

        let mut reader = BerReader::new(&bytes);
        let outer_len = reader.expect_constructed(0x30).unwrap();
        assert_eq!(outer_len, bytes.len() - reader.position());
        let inner_len = reader.expect_constructed(0x30).unwrap();
        assert_eq!(inner_len, bytes.len() - reader.position());
        let value = reader.read_octet_string().unwrap();
        assert_eq!(value.len(), 200);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn high_tag_number_form() {
        // Context tag 31 is the first to need the extension octet
        let node = BerNode::primitive(BerClass::ContextSpecific, 31, vec![0xAA], "tag 31");
        assert_eq!(node.to_bytes(), vec![0x9F, 0x1F, 0x01, 0xAA]);

        // Tag 201 spans two base-128 octets: 0x81 0x49
        let node = BerNode::primitive(BerClass::ContextSpecific, 201, Vec::new(), "tag 201");
        assert_eq!(node.to_bytes(), vec![0x9F, 0x81, 0x49, 0x00]);
    }

    #[test]
    #[should_panic(expected = "cannot append child")]
    fn append_to_primitive_panics() {
        let mut leaf = BerNode::octet_string("leaf", "leaf");
        leaf.append_child(BerNode::octet_string("child", "child"));
    }
}
