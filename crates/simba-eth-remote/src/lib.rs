//! Client for the SIMBA platform REST API.
//!
//! `HttpClient` speaks JSON to the platform, `SimbaClient` wraps the
//! endpoints a workflow deploy needs, and `SimbaExecutor` plugs those into the
//! core `Deployer`.

pub mod client;
pub mod config;
pub mod deployment;
pub mod executor;
pub mod http;

pub use client::{ArtifactUpload, CompiledDesign, DesignDeployment, DesignUpload, SimbaClient};
pub use config::PlatformConfig;
pub use deployment::{deployed_address, deployed_contract_id, DeploymentState};
pub use executor::SimbaExecutor;
pub use http::HttpClient;

/// Value of the `X-Simba-Client` header sent on every request.
pub const CLIENT_HEADER: &str = concat!("simba-eth/", env!("CARGO_PKG_VERSION"));

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("platform I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP {status} for {url}: {message}")]
    Http {
        status: u16,
        url: String,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("platform config error: {0}")]
    Config(String),
    #[error("unexpected platform response: {0}")]
    InvalidResponse(String),
    #[error("deployment {id} failed: {message}")]
    DeploymentFailed { id: String, message: String },
    #[error("transaction {id} failed: {message}")]
    TransactionFailed { id: String, message: String },
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("interrupted while waiting for {0}")]
    Interrupted(String),
}
