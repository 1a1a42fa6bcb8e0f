use crate::deployment::DeploymentState;
use crate::{HttpClient, PlatformConfig, RemoteError};
use serde_json::{json, Map, Value};
use simba_eth_codec::{DeploymentId, DesignId, TxnId};
use std::collections::BTreeMap;
use std::time::Instant;

/// Typed access to the platform endpoints a workflow deploy uses.
pub struct SimbaClient {
    http: HttpClient,
}

/// Body of a `deployed_artifacts/create` call.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactUpload<'a> {
    pub lib_name: &'a str,
    /// Base64 of the library source.
    pub code: &'a str,
    pub blockchain: &'a str,
    pub app_name: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct DesignUpload<'a> {
    pub name: &'a str,
    /// Base64 of the contract source.
    pub code: &'a str,
    pub target_contract: &'a str,
    pub libraries: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy)]
pub struct DesignDeployment<'a> {
    pub api_name: &'a str,
    pub app_name: &'a str,
    pub blockchain: &'a str,
    pub storage: Option<&'a str>,
    pub args: &'a Map<String, Value>,
}

/// A compiled contract design.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDesign {
    pub id: DesignId,
    pub abi: Vec<Value>,
    pub metadata: Map<String, Value>,
}

impl SimbaClient {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            http: HttpClient::new(config),
        }
    }

    pub fn from_http(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn config(&self) -> &PlatformConfig {
        self.http.config()
    }

    pub fn create_artifact(
        &self,
        org: &str,
        upload: ArtifactUpload<'_>,
    ) -> Result<DeploymentId, RemoteError> {
        let body = json!({
            "lib_name": upload.lib_name,
            "code": upload.code,
            "language": "solidity",
            "blockchain": upload.blockchain,
            "app_name": upload.app_name,
        });
        let resp = self.http.post_json(
            &format!("/v2/organisations/{org}/deployed_artifacts/create/"),
            &body,
        )?;
        Ok(DeploymentId::new(required_str(&resp, "deployment_id")?))
    }

    pub fn compile_design(
        &self,
        org: &str,
        upload: DesignUpload<'_>,
    ) -> Result<CompiledDesign, RemoteError> {
        let body = json!({
            "name": upload.name,
            "code": upload.code,
            "language": "solidity",
            "target_contract": upload.target_contract,
            "libraries": upload.libraries,
            "encode": false,
        });
        let resp = self.http.post_json(
            &format!("/v2/organisations/{org}/contract_designs/compile/"),
            &body,
        )?;
        let abi = match resp.get("abi") {
            Some(Value::Array(entries)) => entries.clone(),
            _ => Vec::new(),
        };
        let metadata = match resp.get("metadata") {
            Some(Value::Object(m)) => m.clone(),
            _ => Map::new(),
        };
        Ok(CompiledDesign {
            id: DesignId::new(required_str(&resp, "id")?),
            abi,
            metadata,
        })
    }

    pub fn deploy_design(
        &self,
        org: &str,
        design_id: &DesignId,
        deployment: DesignDeployment<'_>,
    ) -> Result<DeploymentId, RemoteError> {
        let body = json!({
            "api_name": deployment.api_name,
            "app_name": deployment.app_name,
            "blockchain": deployment.blockchain,
            "storage": deployment.storage.unwrap_or("no_storage"),
            "args": deployment.args,
        });
        let resp = self.http.post_json(
            &format!("/v2/organisations/{org}/contract_designs/{design_id}/deploy/"),
            &body,
        )?;
        Ok(DeploymentId::new(required_str(&resp, "deployment_id")?))
    }

    pub fn get_deployment(&self, org: &str, id: &DeploymentId) -> Result<Value, RemoteError> {
        self.http
            .get_json(&format!("/v2/organisations/{org}/deployments/{id}/"))
    }

    /// Poll a deployment until it completes, fails, or the deadline passes.
    pub fn wait_for_deployment(&self, org: &str, id: &DeploymentId) -> Result<Value, RemoteError> {
        self.poll(&format!("deployment {id}"), || self.get_deployment(org, id))
            .map_err(|failure| match failure {
                Failure::Failed(message) => RemoteError::DeploymentFailed {
                    id: id.to_string(),
                    message,
                },
                Failure::Error(e) => e,
            })
    }

    pub fn call_method(
        &self,
        org: &str,
        app: &str,
        api_name: &str,
        method: &str,
        args: &Map<String, Value>,
    ) -> Result<TxnId, RemoteError> {
        let resp = self.http.post_json(
            &format!("/v2/organisations/{org}/applications/{app}/contract/{api_name}/{method}/"),
            &Value::Object(args.clone()),
        )?;
        Ok(TxnId::new(required_str(&resp, "id")?))
    }

    pub fn get_transaction(&self, org: &str, app: &str, id: &TxnId) -> Result<Value, RemoteError> {
        self.http.get_json(&format!(
            "/v2/organisations/{org}/applications/{app}/transactions/{id}/"
        ))
    }

    pub fn wait_for_transaction(
        &self,
        org: &str,
        app: &str,
        id: &TxnId,
    ) -> Result<Value, RemoteError> {
        self.poll(&format!("transaction {id}"), || {
            self.get_transaction(org, app, id)
        })
        .map_err(|failure| match failure {
            Failure::Failed(message) => RemoteError::TransactionFailed {
                id: id.to_string(),
                message,
            },
            Failure::Error(e) => e,
        })
    }

    /// Point the proxy contract `proxy_id` at `implementation_id`.
    pub fn set_proxy(
        &self,
        org: &str,
        proxy_id: &str,
        implementation_id: &str,
    ) -> Result<Value, RemoteError> {
        self.http.put_json(
            &format!("/v2/organisations/{org}/deployed_contracts/{proxy_id}/proxy/"),
            &json!({ "implementation": implementation_id }),
        )
    }

    fn poll(
        &self,
        what: &str,
        mut fetch: impl FnMut() -> Result<Value, RemoteError>,
    ) -> Result<Value, Failure> {
        let deadline = Instant::now() + self.config().deployment_timeout();
        loop {
            let record = fetch().map_err(Failure::Error)?;
            match DeploymentState::of(&record) {
                DeploymentState::Completed => return Ok(record),
                DeploymentState::Failed(message) => return Err(Failure::Failed(message)),
                DeploymentState::Pending(state) => {
                    tracing::debug!("{what} is {state}");
                }
            }
            if simba_eth_core::shutdown_requested() {
                return Err(Failure::Error(RemoteError::Interrupted(what.to_owned())));
            }
            if Instant::now() >= deadline {
                return Err(Failure::Error(RemoteError::Timeout(what.to_owned())));
            }
            std::thread::sleep(self.config().poll_interval());
        }
    }
}

enum Failure {
    Failed(String),
    Error(RemoteError),
}

fn required_str(resp: &Value, key: &str) -> Result<String, RemoteError> {
    match resp.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(RemoteError::InvalidResponse(format!(
            "missing '{key}' in {resp}"
        ))),
    }
}
