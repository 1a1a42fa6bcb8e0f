mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{
    Bytes32Command, ConfigCommand, KeyArgs, SignCommand, WalletCommand, WorkflowCommand,
    EXIT_FAILURE, EXIT_PLATFORM_ERROR, EXIT_WORKFLOW_ERROR,
};
use simba_eth_core::install_signal_handler;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "simba-eth",
    version,
    about = "Ethereum wallets, signing and SIMBA workflow deploys"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a wallet or show its address.
    Wallet {
        #[command(subcommand)]
        action: WalletCommand,
    },
    /// Sign transactions, messages or packed values.
    Sign {
        #[command(flatten)]
        key: KeyArgs,
        #[command(subcommand)]
        action: SignCommand,
    },
    /// Keccak-256 of a UTF-8 string.
    Hash {
        text: String,
        /// Print the hash as a decimal uint256.
        #[arg(long, default_value_t = false)]
        uint256: bool,
    },
    /// Convert between text and bytes32 words.
    Bytes32 {
        #[command(subcommand)]
        action: Bytes32Command,
    },
    /// Validate, deploy and inspect deploy workflows.
    Workflow {
        #[command(subcommand)]
        action: WorkflowCommand,
    },
    /// Show or change the SIMBA platform configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SIMBA_ETH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Wallet { action } => commands::wallet::run(action, json_output),
        Commands::Sign { key, action } => commands::sign::run(&key, action, json_output),
        Commands::Hash { text, uint256 } => commands::hash::run(&text, uint256, json_output),
        Commands::Bytes32 { action } => commands::bytes32::run(action, json_output),
        Commands::Workflow { action } => commands::workflow::run(action, json_output),
        Commands::Config { action } => commands::config::run(action, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("workflow error:")
        || msg.starts_with("failed to read workflow")
        || msg.starts_with("workflow lock:")
    {
        EXIT_WORKFLOW_ERROR
    } else if msg.starts_with("platform ") {
        EXIT_PLATFORM_ERROR
    } else {
        EXIT_FAILURE
    }
}
