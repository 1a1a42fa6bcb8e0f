use super::{
    colorize_state, json_pretty, platform_error, spin_fail, spin_ok, spinner, workflow_error,
    EXIT_SUCCESS,
};
use clap::Subcommand;
use simba_eth_core::{
    default_state_path, load_workflow, save_workflow, Deployer, DeployReport, Workflow,
    WorkflowLock,
};
use simba_eth_remote::{PlatformConfig, SimbaExecutor};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Subcommand)]
pub enum WorkflowCommand {
    /// Check a workflow file without contacting the platform.
    Validate { file: PathBuf },
    /// Run the pending actions of a workflow against the platform.
    Deploy {
        file: PathBuf,
        /// Where progress is written (defaults next to the workflow).
        #[arg(long)]
        state: Option<PathBuf>,
        /// Platform base URL, overriding config and environment.
        #[arg(long)]
        url: Option<String>,
        /// Bearer token, overriding config and environment.
        #[arg(long, hide_env_values = true)]
        token: Option<String>,
        /// Deploy under this organisation instead of the workflow's or the
        /// configured one.
        #[arg(long)]
        org: Option<String>,
    },
    /// Show completed and pending actions.
    Status {
        file: PathBuf,
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

pub fn run(action: WorkflowCommand, json: bool) -> Result<u8, String> {
    match action {
        WorkflowCommand::Validate { file } => validate(&file, json),
        WorkflowCommand::Deploy {
            file,
            state,
            url,
            token,
            org,
        } => {
            let mut config = PlatformConfig::load_default().map_err(|e| platform_error(&e))?;
            if let Some(url) = url {
                config.url = url.trim_end_matches('/').to_owned();
            }
            if token.is_some() {
                config.auth_token = token;
            }
            config.ensure_url().map_err(|e| platform_error(&e))?;
            let state = state.unwrap_or_else(|| default_state_path(&file));
            deploy(&file, &state, config, org, json)
        }
        WorkflowCommand::Status { file, state } => {
            let state = state.unwrap_or_else(|| default_state_path(&file));
            status(&file, &state, json)
        }
    }
}

fn read_workflow(path: &Path) -> Result<Workflow, String> {
    load_workflow(path).map_err(|e| format!("failed to read workflow {}: {e}", path.display()))
}

/// The saved state when there is one, otherwise the workflow as written.
fn current_workflow(file: &Path, state: &Path) -> Result<Workflow, String> {
    if state != file && state.exists() {
        debug!("resuming from {}", state.display());
        read_workflow(state)
    } else {
        read_workflow(file)
    }
}

fn validate(file: &Path, json: bool) -> Result<u8, String> {
    let workflow = read_workflow(file)?;
    workflow.validate().map_err(|e| workflow_error(&e))?;
    if json {
        let payload = serde_json::json!({
            "valid": true,
            "app_name": workflow.app_name,
            "org": workflow.org,
            "pending": workflow.actions.len(),
            "completed": workflow.completed.len(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "{}: valid ({} pending, {} completed)",
            file.display(),
            workflow.actions.len(),
            workflow.completed.len()
        );
    }
    Ok(EXIT_SUCCESS)
}

fn deploy(
    file: &Path,
    state: &Path,
    config: PlatformConfig,
    org: Option<String>,
    json: bool,
) -> Result<u8, String> {
    let _lock = WorkflowLock::try_acquire(state)
        .map_err(|e| format!("workflow lock: {e}"))?
        .ok_or_else(|| {
            let holder = WorkflowLock::holder(state)
                .map_or_else(|| "another process".to_owned(), |pid| format!("pid {pid}"));
            format!("workflow lock: {} is being deployed by {holder}", state.display())
        })?;

    let mut workflow = current_workflow(file, state)?;
    apply_platform_defaults(&mut workflow, org, &config)?;
    workflow.validate().map_err(|e| workflow_error(&e))?;

    info!("deploying {} to {}", file.display(), config.url);
    let deployer = Deployer::new(SimbaExecutor::new(config));
    let pb = (!json).then(|| spinner(&format!("deploying {} actions...", workflow.actions.len())));

    let outcome = deployer.deploy(&mut workflow);
    // Progress is kept even when the run halts part-way.
    let saved = save_workflow(state, &workflow);

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            if let Some(pb) = pb {
                spin_fail(&pb, "deploy failed");
            }
            saved.map_err(|e| workflow_error(&e))?;
            return Err(workflow_error(&e));
        }
    };
    saved.map_err(|e| workflow_error(&e))?;

    if let Some(pb) = pb {
        if report.is_complete() {
            spin_ok(&pb, &format!("deployed {} actions", report.deployed.len()));
        } else {
            spin_fail(&pb, &format!("deployed {} actions, stopped", report.deployed.len()));
        }
    }
    print_report(&report, &workflow, state, json)?;

    if let Some(halted) = report.halted {
        return Err(format!(
            "platform error: halted at '{}' ({}): {}",
            halted.name,
            halted.state,
            halted.message.as_deref().unwrap_or("no message")
        ));
    }
    if report.interrupted {
        return Err(format!(
            "interrupted; {} actions still pending in {}",
            report.remaining,
            state.display()
        ));
    }
    Ok(EXIT_SUCCESS)
}

/// `--org` wins; otherwise the configured org and app fill fields the
/// workflow leaves empty.
fn apply_platform_defaults(
    workflow: &mut Workflow,
    org: Option<String>,
    config: &PlatformConfig,
) -> Result<(), String> {
    if let Some(org) = org {
        workflow.org = org;
    } else if workflow.org.is_empty() {
        workflow.org = config.org.clone().unwrap_or_default();
    }
    if workflow.app_name.is_empty() {
        workflow.app_name = config.app.clone().unwrap_or_default();
    }
    if workflow.org.is_empty() {
        return Err(
            "workflow error: no org; set it in the workflow, pass --org or set SIMBA_ORG"
                .to_owned(),
        );
    }
    if workflow.app_name.is_empty() {
        return Err(
            "workflow error: no app_name; set it in the workflow or run `simba-eth config set --app`"
                .to_owned(),
        );
    }
    Ok(())
}

fn print_report(
    report: &DeployReport,
    workflow: &Workflow,
    state: &Path,
    json: bool,
) -> Result<(), String> {
    if json {
        let payload = serde_json::json!({
            "report": report,
            "state_file": state,
            "addresses": addresses(workflow),
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(());
    }
    for name in &report.deployed {
        let address = workflow
            .completed
            .get(name)
            .and_then(|a| a.contract.as_ref())
            .and_then(|c| c.address.as_deref())
            .unwrap_or("-");
        println!("  {name:<24} {address}");
    }
    if report.remaining > 0 {
        println!("{} actions pending; progress saved to {}", report.remaining, state.display());
    }
    Ok(())
}

fn addresses(workflow: &Workflow) -> serde_json::Map<String, serde_json::Value> {
    workflow
        .completed
        .iter()
        .filter_map(|(name, action)| {
            let address = action.contract.as_ref()?.address.clone()?;
            Some((name.clone(), serde_json::Value::String(address)))
        })
        .collect()
}

fn status(file: &Path, state: &Path, json: bool) -> Result<u8, String> {
    let workflow = current_workflow(file, state)?;
    if json {
        let pending: Vec<_> = workflow
            .actions
            .iter()
            .map(|a| {
                serde_json::json!({
                    "name": a.name(),
                    "type": a.action_type.to_string(),
                    "state": a.action_state.to_string(),
                    "error": a.error_message,
                })
            })
            .collect();
        let payload = serde_json::json!({
            "app_name": workflow.app_name,
            "org": workflow.org,
            "completed": addresses(&workflow),
            "pending": pending,
            "updated_at": workflow.updated_at,
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("{}/{} on {}", workflow.org, workflow.app_name, workflow.blockchain);
    for (name, action) in &workflow.completed {
        let address = action
            .contract
            .as_ref()
            .and_then(|c| c.address.as_deref())
            .unwrap_or("-");
        println!(
            "  {name:<24} {:<22} {address}",
            colorize_state(&action.action_state.to_string())
        );
    }
    for action in &workflow.actions {
        println!(
            "  {:<24} {:<22} {}",
            action.name(),
            colorize_state(&action.action_state.to_string()),
            action.error_message.as_deref().unwrap_or("")
        );
    }
    if workflow.is_finished() {
        println!("all actions completed");
    }
    Ok(EXIT_SUCCESS)
}
