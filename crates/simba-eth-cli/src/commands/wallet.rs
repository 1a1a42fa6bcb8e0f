use super::{json_pretty, KeyArgs, EXIT_SUCCESS};
use clap::Subcommand;
use simba_eth_wallet::{DerivationPath, HdWallet};

#[derive(Debug, Subcommand)]
pub enum WalletCommand {
    /// Generate a new mnemonic wallet and print its words and address.
    New {
        /// Number of mnemonic words: 12, 15, 18, 21 or 24.
        #[arg(long, default_value_t = 12)]
        words: usize,
        /// BIP-32 derivation path.
        #[arg(long, default_value = simba_eth_wallet::DEFAULT_DERIVATION_PATH)]
        derivation_path: String,
        /// Also print the derived private key.
        #[arg(long, default_value_t = false)]
        show_private_key: bool,
    },
    /// Print the address of a key or mnemonic.
    Address {
        #[command(flatten)]
        key: KeyArgs,
    },
}

pub fn run(action: WalletCommand, json: bool) -> Result<u8, String> {
    match action {
        WalletCommand::New {
            words,
            derivation_path,
            show_private_key,
        } => new_wallet(words, &derivation_path, show_private_key, json),
        WalletCommand::Address { key } => {
            let wallet = key.load_wallet()?;
            let address = wallet.get_address().map_err(|e| e.to_string())?;
            if json {
                let payload = serde_json::json!({ "address": address.to_checksum() });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!("{address}");
            }
            Ok(EXIT_SUCCESS)
        }
    }
}

fn new_wallet(words: usize, path: &str, show_private_key: bool, json: bool) -> Result<u8, String> {
    let path: DerivationPath = path.parse().map_err(|e| format!("{e}"))?;
    let mut wallet = HdWallet::with_path(path);
    let mnemonic = wallet.generate_new(words).map_err(|e| e.to_string())?;
    let address = wallet.get_address().map_err(|e| e.to_string())?;
    let private_key = if show_private_key {
        Some(wallet.private_key().map_err(|e| e.to_string())?)
    } else {
        None
    };

    if json {
        let payload = serde_json::json!({
            "address": address.to_checksum(),
            "mnemonic": mnemonic.as_str(),
            "derivation_path": wallet.derivation_path().to_string(),
            "private_key": private_key.as_ref().map(|k| k.as_str()),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("address:  {address}");
        println!("mnemonic: {}", mnemonic.as_str());
        println!("path:     {}", wallet.derivation_path());
        if let Some(ref key) = private_key {
            println!("key:      0x{}", key.as_str());
        }
        eprintln!("store the mnemonic safely; it is the only way to recover this wallet");
    }
    Ok(EXIT_SUCCESS)
}
