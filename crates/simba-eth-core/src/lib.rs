//! Deployment workflows for the SIMBA platform.
//!
//! A `Workflow` is an ordered list of actions (library deploys, contract
//! deploys, method calls, proxy deploys) with dependencies between them. The
//! `Deployer` runs the pending actions against an `Executor` backend, moving
//! each finished action into `completed`. A failed action halts the run and
//! stays at the head of the list, so running again resumes where it stopped.

pub mod calldata;
pub mod concurrency;
pub mod engine;
pub mod executor;
pub mod lifecycle;
pub mod state;
pub mod workflow;

pub use calldata::{encode_calldata, proxy_args, PROXY_CONTRACT_NAME};
pub use concurrency::{install_signal_handler, shutdown_requested, WorkflowLock};
pub use engine::{DeployReport, Deployer, HaltedAction};
pub use executor::{
    CompileRequest, ContractDeployment, Executor, LibraryDeployment, ProxyUpdate,
    TransactionRequest, PROXY_SOURCE,
};
pub use lifecycle::validate_transition;
pub use state::{default_state_path, load_workflow, save_workflow};
pub use workflow::{
    parse_workflow_file, parse_workflow_str, Action, ActionState, ActionType, Contract,
    Dependency, DependencyType, Workflow, WorkflowError, WorkflowFormat,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("calldata error: {0}")]
    Calldata(String),
    #[error("encoding error: {0}")]
    Codec(#[from] simba_eth_codec::CodecError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to parse TOML workflow: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("interrupted: {0}")]
    Interrupted(String),
}
