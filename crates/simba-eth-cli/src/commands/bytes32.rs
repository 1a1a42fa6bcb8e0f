use super::{json_pretty, EXIT_SUCCESS};
use clap::Subcommand;
use simba_eth_codec::{convert_bytes32_to_string, convert_to_bytes32_array};

#[derive(Debug, Subcommand)]
pub enum Bytes32Command {
    /// Split text into zero-padded bytes32 words.
    Encode {
        text: String,
        /// Number of words to produce; longer text is truncated.
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// Omit the 0x prefix on each word.
        #[arg(long, default_value_t = false)]
        no_prefix: bool,
    },
    /// Join bytes32 words back into text.
    Decode {
        #[arg(required = true)]
        words: Vec<String>,
        /// Only decode the first N words.
        #[arg(long)]
        count: Option<usize>,
    },
}

pub fn run(action: Bytes32Command, json: bool) -> Result<u8, String> {
    match action {
        Bytes32Command::Encode {
            text,
            count,
            no_prefix,
        } => {
            if count == 0 {
                return Err("--count must be at least 1".to_owned());
            }
            let words = convert_to_bytes32_array(&text, count, !no_prefix);
            if json {
                println!("{}", json_pretty(&words)?);
            } else {
                for word in &words {
                    println!("{word}");
                }
            }
        }
        Bytes32Command::Decode { words, count } => {
            let text = convert_bytes32_to_string(&words, count).map_err(|e| e.to_string())?;
            if json {
                println!("{}", json_pretty(&serde_json::json!({ "text": text }))?);
            } else {
                println!("{text}");
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
