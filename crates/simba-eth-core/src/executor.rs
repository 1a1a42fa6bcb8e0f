//! The backend seam of the deployer.
//!
//! An `Executor` performs the platform calls a workflow needs. The `Deployer`
//! decides what to call and records the outcome on each action; executors only
//! talk to the backend and report success or a displayable error.

use crate::workflow::Contract;
use serde_json::{Map, Value};
use simba_eth_codec::TxnId;
use std::collections::BTreeMap;
use std::fmt;

/// Source of the upgradeable proxy deployed for DEPLOY_PROXY actions.
pub const PROXY_SOURCE: &str = include_str!("../resources/SIMBAProxy.sol");

#[derive(Debug, Clone, Copy)]
pub struct LibraryDeployment<'a> {
    pub org: &'a str,
    pub app_name: &'a str,
    pub blockchain: &'a str,
    pub lib_name: &'a str,
    pub code: &'a str,
    /// When true the backend base64-encodes `code` before upload.
    pub encode: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub org: &'a str,
    pub name: &'a str,
    pub code: &'a str,
    pub target_contract: &'a str,
    pub libraries: &'a BTreeMap<String, String>,
    pub encode: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ContractDeployment<'a> {
    pub org: &'a str,
    pub app_name: &'a str,
    pub blockchain: &'a str,
    pub storage: Option<&'a str>,
    pub api_name: &'a str,
    /// Compiled design to deploy; carries `design_id`, `abi` and `metadata`.
    pub contract: &'a Contract,
    pub args: &'a Map<String, Value>,
}

#[derive(Debug, Clone, Copy)]
pub struct TransactionRequest<'a> {
    pub org: &'a str,
    pub app_name: &'a str,
    pub api_name: &'a str,
    pub method: &'a str,
    pub args: &'a Map<String, Value>,
    /// Block until the platform reports the transaction as final.
    pub wait: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ProxyUpdate<'a> {
    pub org: &'a str,
    pub app_name: &'a str,
    pub blockchain: &'a str,
    pub proxy: &'a Contract,
    pub implementation: &'a Contract,
}

/// Platform operations a workflow deploy is made of.
pub trait Executor: Send + Sync {
    type Error: fmt::Display;

    /// Compile and deploy a library in one step. Returns its address.
    fn deploy_library(&self, request: LibraryDeployment<'_>) -> Result<Contract, Self::Error>;

    /// Compile a contract into a design. Returns `design_id`, `abi` and `metadata`.
    fn compile_contract(&self, request: CompileRequest<'_>) -> Result<Contract, Self::Error>;

    /// Deploy a compiled design. Returns the contract with `id` and `address` set.
    fn deploy_contract(&self, request: ContractDeployment<'_>) -> Result<Contract, Self::Error>;

    fn submit_transaction(&self, request: TransactionRequest<'_>) -> Result<TxnId, Self::Error>;

    /// Point a deployed proxy at its implementation.
    fn set_proxy(&self, request: ProxyUpdate<'_>) -> Result<String, Self::Error>;

    fn proxy_source(&self) -> &str {
        PROXY_SOURCE
    }
}
