use crate::client::{ArtifactUpload, DesignDeployment, DesignUpload};
use crate::deployment::{deployed_address, deployed_contract_id};
use crate::{PlatformConfig, RemoteError, SimbaClient};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use simba_eth_codec::TxnId;
use simba_eth_core::{
    CompileRequest, Contract, ContractDeployment, Executor, LibraryDeployment, ProxyUpdate,
    TransactionRequest,
};
use std::borrow::Cow;

/// Runs workflow actions against the SIMBA platform.
pub struct SimbaExecutor {
    client: SimbaClient,
}

impl SimbaExecutor {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            client: SimbaClient::new(config),
        }
    }

    pub fn client(&self) -> &SimbaClient {
        &self.client
    }
}

impl From<SimbaClient> for SimbaExecutor {
    fn from(client: SimbaClient) -> Self {
        Self { client }
    }
}

fn upload_code(code: &str, encode: bool) -> Cow<'_, str> {
    if encode {
        Cow::Owned(STANDARD.encode(code))
    } else {
        Cow::Borrowed(code)
    }
}

fn address_in(record: &Value, name: &str) -> Result<String, RemoteError> {
    deployed_address(record, name)
        .ok_or_else(|| RemoteError::InvalidResponse(format!("deployment has no address for '{name}'")))
}

impl Executor for SimbaExecutor {
    type Error = RemoteError;

    fn deploy_library(&self, request: LibraryDeployment<'_>) -> Result<Contract, RemoteError> {
        let code = upload_code(request.code, request.encode);
        let deployment_id = self.client.create_artifact(
            request.org,
            ArtifactUpload {
                lib_name: request.lib_name,
                code: &code,
                blockchain: request.blockchain,
                app_name: request.app_name,
            },
        )?;
        tracing::debug!("library '{}' deploying as {deployment_id}", request.lib_name);
        let record = self.client.wait_for_deployment(request.org, &deployment_id)?;

        Ok(Contract {
            id: deployed_contract_id(&record),
            address: Some(address_in(&record, request.lib_name)?),
            api_name: Some(request.lib_name.to_owned()),
            ..Contract::default()
        })
    }

    fn compile_contract(&self, request: CompileRequest<'_>) -> Result<Contract, RemoteError> {
        let code = upload_code(request.code, request.encode);
        let design = self.client.compile_design(
            request.org,
            DesignUpload {
                name: request.name,
                code: &code,
                target_contract: request.target_contract,
                libraries: request.libraries,
            },
        )?;
        tracing::debug!("'{}' compiled as design {}", request.name, design.id);

        Ok(Contract {
            design_id: Some(design.id),
            abi: Some(design.abi),
            metadata: Some(design.metadata),
            ..Contract::default()
        })
    }

    fn deploy_contract(&self, request: ContractDeployment<'_>) -> Result<Contract, RemoteError> {
        let design_id = request.contract.design_id.as_ref().ok_or_else(|| {
            RemoteError::InvalidResponse(format!("'{}' has no compiled design", request.api_name))
        })?;
        let deployment_id = self.client.deploy_design(
            request.org,
            design_id,
            DesignDeployment {
                api_name: request.api_name,
                app_name: request.app_name,
                blockchain: request.blockchain,
                storage: request.storage,
                args: request.args,
            },
        )?;
        tracing::debug!("'{}' deploying as {deployment_id}", request.api_name);
        let record = self.client.wait_for_deployment(request.org, &deployment_id)?;

        let mut contract = request.contract.clone();
        contract.address = Some(address_in(&record, request.api_name)?);
        contract.id = deployed_contract_id(&record);
        contract.api_name = Some(request.api_name.to_owned());
        Ok(contract)
    }

    fn submit_transaction(&self, request: TransactionRequest<'_>) -> Result<TxnId, RemoteError> {
        let txn = self.client.call_method(
            request.org,
            request.app_name,
            request.api_name,
            request.method,
            request.args,
        )?;
        if request.wait {
            self.client
                .wait_for_transaction(request.org, request.app_name, &txn)?;
        }
        Ok(txn)
    }

    fn set_proxy(&self, request: ProxyUpdate<'_>) -> Result<String, RemoteError> {
        let proxy_id = request
            .proxy
            .id
            .as_ref()
            .ok_or_else(|| RemoteError::InvalidResponse("proxy has no contract id".to_owned()))?;
        let impl_id = request.implementation.id.as_ref().ok_or_else(|| {
            RemoteError::InvalidResponse("implementation has no contract id".to_owned())
        })?;
        let resp = self.client.set_proxy(request.org, proxy_id, impl_id)?;
        Ok(resp
            .get("implementation")
            .and_then(Value::as_str)
            .unwrap_or(impl_id.as_str())
            .to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_base64_only_when_asked() {
        assert_eq!(upload_code("library A {}", true), "bGlicmFyeSBBIHt9");
        assert_eq!(upload_code("bGlicmFyeSBBIHt9", false), "bGlicmFyeSBBIHt9");
    }

    #[test]
    fn uncompiled_contract_is_rejected_before_any_request() {
        let executor = SimbaExecutor::new(PlatformConfig::new("http://127.0.0.1:1"));
        let contract = Contract::default();
        let args = serde_json::Map::new();
        let err = executor
            .deploy_contract(ContractDeployment {
                org: "o",
                app_name: "a",
                blockchain: "Quorum",
                storage: None,
                api_name: "token",
                contract: &contract,
                args: &args,
            })
            .unwrap_err();
        assert!(err.to_string().contains("no compiled design"));
    }
}
