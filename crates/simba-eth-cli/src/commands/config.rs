use super::{json_pretty, platform_error, EXIT_SUCCESS};
use clap::Subcommand;
use simba_eth_remote::config::default_config_path;
use simba_eth_remote::PlatformConfig;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Update fields of the stored platform config.
    Set {
        /// Platform base URL.
        #[arg(long)]
        url: Option<String>,
        /// Bearer token for API requests.
        #[arg(long)]
        token: Option<String>,
        /// Default organisation.
        #[arg(long)]
        org: Option<String>,
        /// Default application.
        #[arg(long)]
        app: Option<String>,
        #[arg(long)]
        poll_interval_ms: Option<u64>,
        #[arg(long)]
        deployment_timeout_secs: Option<u64>,
        #[arg(long)]
        request_timeout_secs: Option<u64>,
    },
    /// Print the effective config (file plus environment).
    Show,
}

pub fn run(action: ConfigCommand, json: bool) -> Result<u8, String> {
    let path = default_config_path().map_err(|e| platform_error(&e))?;
    match action {
        ConfigCommand::Set {
            url,
            token,
            org,
            app,
            poll_interval_ms,
            deployment_timeout_secs,
            request_timeout_secs,
        } => {
            let mut config = if path.exists() {
                PlatformConfig::load(&path).map_err(|e| platform_error(&e))?
            } else {
                PlatformConfig::default()
            };
            if let Some(url) = url {
                config.url = url.trim_end_matches('/').to_owned();
            }
            config.auth_token = token.or(config.auth_token);
            config.org = org.or(config.org);
            config.app = app.or(config.app);
            config.poll_interval_ms = poll_interval_ms.unwrap_or(config.poll_interval_ms);
            config.deployment_timeout_secs =
                deployment_timeout_secs.unwrap_or(config.deployment_timeout_secs);
            config.request_timeout_secs = request_timeout_secs.unwrap_or(config.request_timeout_secs);
            config.save(&path).map_err(|e| platform_error(&e))?;

            if json {
                let payload = serde_json::json!({ "path": path, "config": redacted(&config) });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!("saved {}", path.display());
            }
        }
        ConfigCommand::Show => {
            let config = PlatformConfig::load_default().map_err(|e| platform_error(&e))?;
            if json {
                let payload = serde_json::json!({ "path": path, "config": redacted(&config) });
                println!("{}", json_pretty(&payload)?);
            } else {
                let unset = || "(unset)".to_owned();
                println!("config:   {}", path.display());
                println!("url:      {}", if config.url.is_empty() { unset() } else { config.url.clone() });
                println!("token:    {}", config.auth_token.as_ref().map_or_else(unset, |_| "********".to_owned()));
                println!("org:      {}", config.org.clone().unwrap_or_else(unset));
                println!("app:      {}", config.app.clone().unwrap_or_else(unset));
                println!("poll:     {} ms", config.poll_interval_ms);
                println!("timeout:  {} s deploy, {} s request", config.deployment_timeout_secs, config.request_timeout_secs);
            }
        }
    }
    Ok(EXIT_SUCCESS)
}

fn redacted(config: &PlatformConfig) -> PlatformConfig {
    PlatformConfig {
        auth_token: config.auth_token.as_ref().map(|_| "********".to_owned()),
        ..config.clone()
    }
}
