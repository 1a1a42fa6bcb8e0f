use super::{json_pretty, KeyArgs, EXIT_SUCCESS};
use clap::Subcommand;
use serde_json::Value;
use simba_eth_wallet::Signer;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Subcommand)]
pub enum SignCommand {
    /// Sign a transaction given as a JSON file (`-` reads stdin).
    Tx { file: PathBuf },
    /// EIP-191 sign a text message.
    Message { text: String },
    /// Sign packed Solidity values given as `type:value` pairs.
    Values {
        #[arg(required = true)]
        pairs: Vec<String>,
    },
}

pub fn run(key: &KeyArgs, action: SignCommand, json: bool) -> Result<u8, String> {
    let wallet = key.load_wallet()?;
    match action {
        SignCommand::Tx { file } => {
            let payload = read_transaction(&file)?;
            let signed = wallet
                .sign_transaction(&payload)
                .map_err(|e| e.to_string())?;
            if json {
                println!("{}", json_pretty(&signed)?);
            } else {
                println!("hash: {}", signed.hash);
                println!("raw:  {}", signed.raw_transaction);
            }
        }
        SignCommand::Message { text } => {
            let signature = wallet.sign_message(&text).map_err(|e| e.to_string())?;
            print_signature(&wallet, &signature, json)?;
        }
        SignCommand::Values { pairs } => {
            let values = pairs
                .iter()
                .map(|p| parse_pair(p))
                .collect::<Result<Vec<_>, _>>()?;
            let borrowed: Vec<(&str, Value)> = values
                .iter()
                .map(|(ty, value)| (ty.as_str(), value.clone()))
                .collect();
            let signature = wallet.sign_values(&borrowed).map_err(|e| e.to_string())?;
            print_signature(&wallet, &signature, json)?;
        }
    }
    Ok(EXIT_SUCCESS)
}

fn print_signature(wallet: &impl Signer, signature: &str, json: bool) -> Result<(), String> {
    if json {
        let address = wallet.address().map_err(|e| e.to_string())?;
        let payload = serde_json::json!({
            "address": address.to_checksum(),
            "signature": signature,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{signature}");
    }
    Ok(())
}

fn read_transaction(file: &Path) -> Result<Value, String> {
    let content = if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        buf
    } else {
        std::fs::read_to_string(file)
            .map_err(|e| format!("failed to read {}: {e}", file.display()))?
    };
    serde_json::from_str(&content).map_err(|e| format!("transaction is not valid JSON: {e}"))
}

/// `uint256:5` or `string:hello`. Textual types keep the raw text; others
/// are read as JSON when they parse.
fn parse_pair(pair: &str) -> Result<(String, Value), String> {
    let (ty, raw) = pair
        .split_once(':')
        .ok_or_else(|| format!("expected type:value, got '{pair}'"))?;
    let ty = ty.trim();
    if ty.is_empty() {
        return Err(format!("missing type in '{pair}'"));
    }
    let textual = ty == "string" || ty == "address" || ty.starts_with("bytes");
    let value = if textual {
        Value::String(raw.to_owned())
    } else {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
    };
    Ok((ty.to_owned(), value))
}
