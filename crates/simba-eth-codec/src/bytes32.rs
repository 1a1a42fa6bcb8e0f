//! Packing of strings into fixed `bytes32[]` contract arguments.
//!
//! SIMBA contracts store short text as arrays of `bytes32` words. Text is
//! truncated to `count * 32` bytes and zero padded; decoding strips the
//! trailing NULs again.

use crate::{decode_hex, CodecError};

pub fn convert_to_bytes32_array(value: &str, count: usize, prefix: bool) -> Vec<String> {
    let mut bytes = value.as_bytes().to_vec();
    bytes.resize(count * 32, 0);
    bytes
        .chunks(32)
        .map(|word| {
            if prefix {
                format!("0x{}", hex::encode(word))
            } else {
                hex::encode(word)
            }
        })
        .collect()
}

/// Decode the first `count` words (all when `None`) back into a string.
pub fn convert_bytes32_to_string<S: AsRef<str>>(
    words: &[S],
    count: Option<usize>,
) -> Result<String, CodecError> {
    let take = count.unwrap_or(words.len()).min(words.len());
    let mut bytes = Vec::with_capacity(take * 32);
    for word in &words[..take] {
        bytes.extend(decode_hex(word.as_ref())?);
    }
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "2020 Lorem ipsum dolor sit amet";
    const DESCRIPTION: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempor incididunt ut lab";
    const IMAGE: &str = "https://picsum.photos/200/300/?t=asdfj938j0qf98jas0df8je098j2faa";

    #[test]
    fn single_word_roundtrip() {
        let words = convert_to_bytes32_array(" Edition 1000000000/1000000000", 1, true);
        assert_eq!(words.len(), 1);
        assert!(words[0].starts_with("0x"));
        assert_eq!(words[0].len(), 66);
        assert_eq!(
            convert_bytes32_to_string(&words, Some(1)).unwrap(),
            " Edition 1000000000/1000000000"
        );
    }

    #[test]
    fn multi_word_fields_with_and_without_prefix() {
        for prefix in [true, false] {
            let name = convert_to_bytes32_array(NAME, 1, prefix);
            let description = convert_to_bytes32_array(DESCRIPTION, 4, prefix);
            let image = convert_to_bytes32_array(IMAGE, 4, prefix);

            assert_eq!(convert_bytes32_to_string(&name, None).unwrap(), NAME);
            assert_eq!(
                convert_bytes32_to_string(&description, None).unwrap(),
                DESCRIPTION
            );
            assert_eq!(convert_bytes32_to_string(&image, Some(4)).unwrap(), IMAGE);
        }
    }

    #[test]
    fn decoding_fewer_words_truncates() {
        let description = convert_to_bytes32_array(DESCRIPTION, 4, true);
        let truncated = convert_bytes32_to_string(&description, Some(2)).unwrap();
        assert_eq!(
            truncated,
            "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do "
        );
        assert_eq!(truncated.len(), 64);
    }

    #[test]
    fn encoding_truncates_long_input() {
        let words = convert_to_bytes32_array(DESCRIPTION, 1, false);
        assert_eq!(words.len(), 1);
        assert_eq!(
            convert_bytes32_to_string(&words, None).unwrap(),
            &DESCRIPTION[..32]
        );
    }

    #[test]
    fn count_larger_than_input_is_clamped() {
        let words = convert_to_bytes32_array("abc", 2, true);
        assert_eq!(convert_bytes32_to_string(&words, Some(10)).unwrap(), "abc");
    }

    #[test]
    fn rejects_non_hex_word() {
        assert!(convert_bytes32_to_string(&["0xzz"], None).is_err());
    }
}
