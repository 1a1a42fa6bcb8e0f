//! Recursive Length Prefix encoding, enough for transaction serialization.

use crate::quantity::to_minimal_be_bytes;
use primitive_types::U256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem {
    Bytes(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        RlpItem::Bytes(data.into())
    }

    /// A scalar, encoded big-endian without leading zeros.
    pub fn uint(value: U256) -> Self {
        RlpItem::Bytes(to_minimal_be_bytes(value))
    }

    pub fn u64(value: u64) -> Self {
        Self::uint(U256::from(value))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            RlpItem::Bytes(data) => {
                if data.len() == 1 && data[0] < 0x80 {
                    out.push(data[0]);
                } else {
                    write_header(out, 0x80, data.len());
                    out.extend_from_slice(data);
                }
            }
            RlpItem::List(items) => {
                let mut payload = Vec::new();
                for item in items {
                    item.encode_into(&mut payload);
                }
                write_header(out, 0xc0, payload.len());
                out.extend(payload);
            }
        }
    }
}

fn write_header(out: &mut Vec<u8>, offset: u8, len: usize) {
    if len <= 55 {
        out.push(offset + len as u8);
    } else {
        let len_bytes = to_minimal_be_bytes(U256::from(len));
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend(len_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_single_bytes_and_short_strings() {
        assert_eq!(RlpItem::bytes(vec![0x0f]).encode(), vec![0x0f]);
        assert_eq!(RlpItem::bytes(vec![0x80]).encode(), vec![0x81, 0x80]);
        assert_eq!(RlpItem::bytes(b"dog".to_vec()).encode(), b"\x83dog".to_vec());
        assert_eq!(RlpItem::bytes(Vec::new()).encode(), vec![0x80]);
    }

    #[test]
    fn encodes_scalars_minimally() {
        assert_eq!(RlpItem::u64(0).encode(), vec![0x80]);
        assert_eq!(RlpItem::u64(15).encode(), vec![0x0f]);
        assert_eq!(RlpItem::u64(1024).encode(), vec![0x82, 0x04, 0x00]);
    }

    #[test]
    fn encodes_nested_lists() {
        let cat_dog = RlpItem::List(vec![
            RlpItem::bytes(b"cat".to_vec()),
            RlpItem::bytes(b"dog".to_vec()),
        ]);
        assert_eq!(cat_dog.encode(), b"\xc8\x83cat\x83dog".to_vec());
        assert_eq!(RlpItem::List(Vec::new()).encode(), vec![0xc0]);
    }

    #[test]
    fn encodes_long_string_header() {
        let data = vec![b'a'; 56];
        let encoded = RlpItem::bytes(data.clone()).encode();
        assert_eq!(&encoded[..2], &[0xb8, 56]);
        assert_eq!(&encoded[2..], &data[..]);
    }
}
