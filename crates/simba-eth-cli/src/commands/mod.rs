pub mod bytes32;
pub mod completions;
pub mod config;
pub mod hash;
pub mod man_pages;
pub mod sign;
pub mod wallet;
pub mod workflow;

pub use bytes32::Bytes32Command;
pub use config::ConfigCommand;
pub use sign::SignCommand;
pub use wallet::WalletCommand;
pub use workflow::WorkflowCommand;

use clap::Args;
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use simba_eth_wallet::{DerivationPath, HdWallet, DEFAULT_DERIVATION_PATH};
use std::io::{stderr, stdin, IsTerminal};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_WORKFLOW_ERROR: u8 = 2;
pub const EXIT_PLATFORM_ERROR: u8 = 3;

/// Where the signing key comes from.
#[derive(Debug, Clone, Args)]
pub struct KeyArgs {
    /// Hex private key, with or without 0x.
    #[arg(long, env = "SIMBA_PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<String>,

    /// BIP-39 mnemonic phrase.
    #[arg(long, env = "SIMBA_MNEMONIC", global = true, hide_env_values = true)]
    pub mnemonic: Option<String>,

    /// BIP-32 derivation path used with --mnemonic.
    #[arg(long, default_value = DEFAULT_DERIVATION_PATH, global = true)]
    pub derivation_path: String,
}

impl KeyArgs {
    /// Load a wallet from the flags, the environment, or a hidden prompt.
    pub fn load_wallet(&self) -> Result<HdWallet, String> {
        let path: DerivationPath = self.derivation_path.parse().map_err(|e| format!("{e}"))?;
        let mut wallet = HdWallet::with_path(path);

        if let Some(ref key) = self.private_key {
            wallet
                .generate_from_private_key(key)
                .map_err(|e| e.to_string())?;
            return Ok(wallet);
        }
        if let Some(ref words) = self.mnemonic {
            wallet
                .generate_from_mnemonic(Some(words.as_str()))
                .map_err(|e| e.to_string())?;
            return Ok(wallet);
        }

        if !(stdin().is_terminal() && stderr().is_terminal()) {
            return Err(
                "no key given: pass --private-key or --mnemonic (or set SIMBA_PRIVATE_KEY / SIMBA_MNEMONIC)"
                    .to_owned(),
            );
        }
        let secret = Password::new()
            .with_prompt("private key or mnemonic")
            .interact()
            .map_err(|e| format!("prompt failed: {e}"))?;
        load_secret(&mut wallet, secret.trim())?;
        Ok(wallet)
    }
}

/// A phrase with spaces is a mnemonic; anything else a private key.
fn load_secret(wallet: &mut HdWallet, secret: &str) -> Result<(), String> {
    if secret.contains(char::is_whitespace) {
        wallet
            .generate_from_mnemonic(Some(secret))
            .map(drop)
            .map_err(|e| e.to_string())
    } else {
        wallet
            .generate_from_private_key(secret)
            .map_err(|e| e.to_string())
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

fn plain_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(plain_style());
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(plain_style());
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "COMPLETED" => Style::new().green().apply_to(state).to_string(),
        "INITED" | "COMPILED" => Style::new().yellow().apply_to(state).to_string(),
        s if s.starts_with("FAILED") || s == "INVALID_STATE" => {
            Style::new().red().bold().apply_to(state).to_string()
        }
        other => other.to_owned(),
    }
}

/// Prefix a core error so it maps to the workflow exit code.
pub fn workflow_error(e: &impl std::fmt::Display) -> String {
    let msg = e.to_string();
    if msg.starts_with("workflow error:") {
        msg
    } else {
        format!("workflow error: {msg}")
    }
}

/// Prefix a remote error so it maps to the platform exit code.
pub fn platform_error(e: &impl std::fmt::Display) -> String {
    let msg = e.to_string();
    if msg.starts_with("platform") {
        msg
    } else {
        format!("platform error: {msg}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn key_args(private_key: Option<&str>, mnemonic: Option<&str>) -> KeyArgs {
        KeyArgs {
            private_key: private_key.map(str::to_owned),
            mnemonic: mnemonic.map(str::to_owned),
            derivation_path: DEFAULT_DERIVATION_PATH.to_owned(),
        }
    }

    #[test]
    fn private_key_flag_loads_wallet() {
        let wallet = key_args(Some(KEY), None).load_wallet().unwrap();
        assert_eq!(
            wallet.get_address().unwrap().to_checksum(),
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"
        );
    }

    #[test]
    fn mnemonic_flag_loads_wallet() {
        let words = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let wallet = key_args(None, Some(words)).load_wallet().unwrap();
        assert_eq!(
            wallet.get_address().unwrap().to_checksum(),
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
    }

    #[test]
    fn bad_derivation_path_is_reported() {
        let mut args = key_args(Some(KEY), None);
        args.derivation_path = "x/1".to_owned();
        assert!(args.load_wallet().unwrap_err().contains("derivation path"));
    }

    #[test]
    fn secret_kind_is_detected() {
        let mut wallet = HdWallet::new();
        load_secret(&mut wallet, KEY).unwrap();
        assert!(wallet.mnemonic().unwrap().is_none());
        assert!(load_secret(&mut wallet, "not a mnemonic").is_err());
    }

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
    }

    #[test]
    fn colorize_known_states() {
        assert!(colorize_state("COMPLETED").contains("COMPLETED"));
        assert!(colorize_state("FAILED_COMPILE").contains("FAILED_COMPILE"));
        assert_eq!(colorize_state("OTHER"), "OTHER");
    }

    #[test]
    fn error_prefixes_are_not_doubled() {
        assert_eq!(workflow_error(&"workflow error: x"), "workflow error: x");
        assert_eq!(workflow_error(&"I/O error: y"), "workflow error: I/O error: y");
        assert_eq!(platform_error(&"HTTP 500"), "platform error: HTTP 500");
        assert_eq!(platform_error(&"platform config error: z"), "platform config error: z");
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_WORKFLOW_ERROR);
        assert_ne!(EXIT_WORKFLOW_ERROR, EXIT_PLATFORM_ERROR);
    }

    #[test]
    fn spinner_finishes() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }
}
