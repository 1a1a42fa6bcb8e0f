use primitive_types::U256;
use sha3::{Digest, Keccak256};

pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    Keccak256::digest(data.as_ref()).into()
}

/// Keccak-256 of the UTF-8 bytes of `value`, as bare lowercase hex.
pub fn keccak_hash(value: &str) -> String {
    hex::encode(keccak256(value.as_bytes()))
}

/// Same result as Solidity's `uint256(keccak256(bytes(value)))`.
pub fn string_to_uint256(value: &str) -> U256 {
    U256::from_big_endian(&keccak256(value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_hash_known_value() {
        assert_eq!(
            keccak_hash("A short string"),
            "c02616352442fd8d6b29e47623743b0644e7168b988c4545b71df141245db363"
        );
    }

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn string_to_uint256_matches_hash_bytes() {
        let value = string_to_uint256("A short string");
        assert_eq!(
            value.to_string(),
            "86911360387564328691877682441780275511611438275732502394544537523081168401251"
        );

        let mut recovered = [0u8; 32];
        value.to_big_endian(&mut recovered);
        assert_eq!(hex::encode(recovered), keccak_hash("A short string"));
    }

    #[test]
    fn string_to_uint256_long_input() {
        let long = format!("A {}long string", vec!["very"; 100].join(" "));
        assert_eq!(
            string_to_uint256(&long).to_string(),
            "44831467989385379626249444820128067825371402133342580492608562458279217187427"
        );
    }
}
