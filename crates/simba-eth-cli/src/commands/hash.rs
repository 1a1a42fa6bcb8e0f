use super::{json_pretty, EXIT_SUCCESS};
use simba_eth_codec::{keccak_hash, string_to_uint256};

pub fn run(text: &str, as_uint256: bool, json: bool) -> Result<u8, String> {
    let hash = keccak_hash(text);
    if json {
        let payload = serde_json::json!({
            "keccak256": hash,
            "uint256": string_to_uint256(text).to_string(),
        });
        println!("{}", json_pretty(&payload)?);
    } else if as_uint256 {
        println!("{}", string_to_uint256(text));
    } else {
        println!("{hash}");
    }
    Ok(EXIT_SUCCESS)
}
