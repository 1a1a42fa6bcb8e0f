use crate::calldata::{proxy_args, PROXY_CONTRACT_NAME};
use crate::concurrency::shutdown_requested;
use crate::executor::{
    CompileRequest, ContractDeployment, Executor, LibraryDeployment, ProxyUpdate,
    TransactionRequest,
};
use crate::lifecycle::validate_transition;
use crate::workflow::{Action, ActionState, ActionType, DependencyType, Workflow};
use crate::CoreError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Runs workflow actions against an `Executor`.
///
/// Each call to `deploy` resumes from the first unfinished action and stops at
/// the first failure, leaving the failed action at the head of `actions`.
pub struct Deployer<E> {
    executor: E,
}

/// The action a deploy run stopped at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HaltedAction {
    pub name: String,
    pub state: ActionState,
    pub message: Option<String>,
}

/// Outcome of one deploy run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    /// Actions moved into `completed` by this run, in order.
    pub deployed: Vec<String>,
    pub halted: Option<HaltedAction>,
    /// Actions still pending after the run.
    pub remaining: usize,
    /// The run stopped early because shutdown was requested.
    pub interrupted: bool,
}

impl DeployReport {
    pub fn is_complete(&self) -> bool {
        self.halted.is_none() && !self.interrupted && self.remaining == 0
    }
}

/// Workflow-level context shared by every request of a run.
#[derive(Clone, Copy)]
struct RunContext<'a> {
    org: &'a str,
    app_name: &'a str,
    blockchain: &'a str,
    storage: Option<&'a str>,
}

impl<E: Executor> Deployer<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    pub fn deploy(&self, workflow: &mut Workflow) -> Result<DeployReport, CoreError> {
        let Workflow {
            app_name,
            org,
            blockchain,
            actions,
            storage,
            completed,
            updated_at,
        } = workflow;
        let ctx = RunContext {
            org: org.as_str(),
            app_name: app_name.as_str(),
            blockchain: blockchain.as_str(),
            storage: storage.as_deref(),
        };

        info!(
            "deploying workflow for {}/{} on {}: {} pending, {} completed",
            ctx.org,
            ctx.app_name,
            ctx.blockchain,
            actions.len(),
            completed.len()
        );

        let mut report = DeployReport::default();
        let mut finished = 0;
        for action in actions.iter_mut() {
            if shutdown_requested() {
                warn!("shutdown requested, stopping before '{}'", action.name());
                report.interrupted = true;
                break;
            }

            if action.action_state != ActionState::Completed {
                let succeeded = match self.resolve_dependencies(action, completed) {
                    Ok(()) => {
                        action.error_message = None;
                        self.run_action(ctx, action)?
                    }
                    Err(message) => {
                        fail(action, ActionState::FailedDependencies, message)?;
                        false
                    }
                };
                if !succeeded {
                    let name = action.name();
                    warn!(
                        "halted at '{name}' ({}): {}",
                        action.action_state,
                        action.error_message.as_deref().unwrap_or("no message")
                    );
                    report.halted = Some(HaltedAction {
                        name,
                        state: action.action_state,
                        message: action.error_message.clone(),
                    });
                    break;
                }
            }

            let name = action.name();
            info!("'{name}' completed");
            completed.insert(name.clone(), action.clone());
            report.deployed.push(name);
            finished += 1;
        }

        actions.drain(..finished);
        report.remaining = actions.len();
        *updated_at = Some(chrono::Utc::now().to_rfc3339());
        Ok(report)
    }

    /// Fill in addresses, contracts and proxy arguments from completed parents.
    ///
    /// Returns the failure message when a parent cannot be resolved.
    fn resolve_dependencies(
        &self,
        action: &mut Action,
        completed: &BTreeMap<String, Action>,
    ) -> Result<(), String> {
        let dependencies = action.dependencies.clone();
        let mut libraries = BTreeMap::new();

        for dep in &dependencies {
            let unresolved = || format!("Dependency on contract {} cannot be resolved", dep.parent);
            let parent = completed
                .get(&dep.parent)
                .and_then(|a| a.contract.as_ref())
                .ok_or_else(unresolved)?;
            let address = || {
                parent
                    .address
                    .clone()
                    .ok_or_else(|| format!("Dependency on contract {} has no address", dep.parent))
            };

            match dep.dependency_type {
                DependencyType::Library => {
                    libraries.insert(dep.parent.clone(), address()?);
                }
                DependencyType::Constructor => {
                    let target = dep.target_arg.as_deref().filter(|t| !t.is_empty()).ok_or_else(
                        || format!("Constructor dependency on {} has no target_arg", dep.parent),
                    )?;
                    action.args.insert(target.to_owned(), json!(address()?));
                }
                DependencyType::Contract => {
                    action.contract = Some(parent.clone());
                }
                DependencyType::Impl => {
                    let args =
                        proxy_args(parent, dep.method_name.as_deref(), dep.method_args.as_ref())
                            .map_err(|e| {
                                format!("Cannot build proxy arguments for {}: {e}", dep.parent)
                            })?;
                    action.impl_contract = Some(parent.clone());
                    action.code = Some(BASE64.encode(self.executor.proxy_source()));
                    action.encode = false;
                    action.contract_name = Some(PROXY_CONTRACT_NAME.to_owned());
                    action.args = args;
                }
            }
            debug!(
                "resolved {:?} dependency of '{}' on '{}'",
                dep.dependency_type,
                action.name(),
                dep.parent
            );
        }

        action.libraries.extend(libraries);
        Ok(())
    }

    fn run_action(&self, ctx: RunContext<'_>, action: &mut Action) -> Result<bool, CoreError> {
        match action.action_type {
            ActionType::DeployLibrary => self.deploy_library(ctx, action),
            ActionType::DeployContract => self.deploy_contract(ctx, action),
            ActionType::MethodCall => self.method_call(ctx, action),
            ActionType::DeployProxy => self.deploy_proxy(ctx, action),
        }
    }

    fn deploy_library(&self, ctx: RunContext<'_>, action: &mut Action) -> Result<bool, CoreError> {
        if action.contract.is_some() {
            fail(action, ActionState::InvalidState, "Contract already exists")?;
            return Ok(false);
        }

        let result = self.executor.deploy_library(LibraryDeployment {
            org: ctx.org,
            app_name: ctx.app_name,
            blockchain: ctx.blockchain,
            lib_name: action.contract_name.as_deref().unwrap_or_default(),
            code: action.code.as_deref().unwrap_or_default(),
            encode: action.encode,
        });
        match result {
            Ok(contract) => {
                action.contract = Some(contract);
                succeed(action)?;
                Ok(true)
            }
            Err(e) => {
                fail(action, ActionState::FailedComplete, e.to_string())?;
                Ok(false)
            }
        }
    }

    fn deploy_contract(&self, ctx: RunContext<'_>, action: &mut Action) -> Result<bool, CoreError> {
        let has_design = action
            .contract
            .as_ref()
            .is_some_and(|c| c.design_id.is_some());
        if !has_design || action.action_state == ActionState::FailedCompile {
            let name = action.contract_name.as_deref().unwrap_or_default();
            let result = self.executor.compile_contract(CompileRequest {
                org: ctx.org,
                name,
                code: action.code.as_deref().unwrap_or_default(),
                target_contract: name,
                libraries: &action.libraries,
                encode: action.encode,
            });
            match result {
                Ok(contract) => {
                    action.contract = Some(contract);
                    action.error_message = None;
                    transition(action, ActionState::Compiled)?;
                }
                Err(e) => {
                    fail(action, ActionState::FailedCompile, e.to_string())?;
                    return Ok(false);
                }
            }
        }

        let Some(design) = action.contract.as_ref() else {
            fail(action, ActionState::InvalidState, "No compiled design to deploy")?;
            return Ok(false);
        };
        let result = self.executor.deploy_contract(ContractDeployment {
            org: ctx.org,
            app_name: ctx.app_name,
            blockchain: ctx.blockchain,
            storage: ctx.storage,
            api_name: action.api_name.as_deref().unwrap_or_default(),
            contract: design,
            args: &action.args,
        });
        match result {
            Ok(contract) => {
                action.contract = Some(contract);
                succeed(action)?;
                Ok(true)
            }
            Err(e) => {
                fail(action, ActionState::FailedComplete, e.to_string())?;
                Ok(false)
            }
        }
    }

    fn method_call(&self, ctx: RunContext<'_>, action: &mut Action) -> Result<bool, CoreError> {
        let api_name = action
            .contract
            .as_ref()
            .and_then(|c| c.api_name.as_deref())
            .or(action.api_name.as_deref())
            .unwrap_or_default();
        let result = self.executor.submit_transaction(TransactionRequest {
            org: ctx.org,
            app_name: ctx.app_name,
            api_name,
            method: action.method_name.as_deref().unwrap_or_default(),
            args: &action.args,
            wait: true,
        });
        match result {
            Ok(txn_id) => {
                info!("'{}' submitted as transaction {txn_id}", action.name());
                succeed(action)?;
                Ok(true)
            }
            Err(e) => {
                fail(action, ActionState::FailedMethodCall, e.to_string())?;
                Ok(false)
            }
        }
    }

    fn deploy_proxy(&self, ctx: RunContext<'_>, action: &mut Action) -> Result<bool, CoreError> {
        if action.action_state != ActionState::FailedSetProxy && !self.deploy_contract(ctx, action)? {
            return Ok(false);
        }

        let (Some(proxy), Some(implementation)) =
            (action.contract.as_ref(), action.impl_contract.as_ref())
        else {
            fail(
                action,
                ActionState::InvalidState,
                "Proxy has no deployed contract or implementation",
            )?;
            return Ok(false);
        };
        let result = self.executor.set_proxy(ProxyUpdate {
            org: ctx.org,
            app_name: ctx.app_name,
            blockchain: ctx.blockchain,
            proxy,
            implementation,
        });
        match result {
            Ok(message) => {
                debug!("set proxy for '{}': {message}", action.name());
                succeed(action)?;
                Ok(true)
            }
            Err(e) => {
                fail(action, ActionState::FailedSetProxy, e.to_string())?;
                Ok(false)
            }
        }
    }
}

fn transition(action: &mut Action, to: ActionState) -> Result<(), CoreError> {
    validate_transition(action.action_state, to)?;
    debug!("'{}': {} -> {to}", action.name(), action.action_state);
    action.action_state = to;
    Ok(())
}

fn succeed(action: &mut Action) -> Result<(), CoreError> {
    action.error_message = None;
    transition(action, ActionState::Completed)
}

fn fail(action: &mut Action, state: ActionState, message: impl Into<String>) -> Result<(), CoreError> {
    transition(action, state)?;
    action.error_message = Some(message.into());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Contract, Dependency};
    use simba_eth_codec::TxnId;
    use std::sync::Mutex;

    /// Records calls and fails the ones named in `failing`.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        failing: Vec<&'static str>,
    }

    impl Recorder {
        fn failing(calls: &[&'static str]) -> Self {
            Self {
                failing: calls.to_vec(),
                ..Self::default()
            }
        }

        fn record(&self, call: &'static str, detail: &str) -> Result<(), String> {
            self.calls.lock().unwrap().push(format!("{call}:{detail}"));
            if self.failing.contains(&call) {
                Err(format!("{call} failed"))
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Executor for Recorder {
        type Error = String;

        fn deploy_library(&self, request: LibraryDeployment<'_>) -> Result<Contract, String> {
            self.record("deploy_library", request.lib_name)?;
            Ok(Contract {
                address: Some(format!("0x{}", request.lib_name)),
                ..Contract::default()
            })
        }

        fn compile_contract(&self, request: CompileRequest<'_>) -> Result<Contract, String> {
            self.record("compile_contract", request.name)?;
            Ok(Contract {
                design_id: Some(format!("design-{}", request.name).into()),
                ..Contract::default()
            })
        }

        fn deploy_contract(&self, request: ContractDeployment<'_>) -> Result<Contract, String> {
            self.record("deploy_contract", request.api_name)?;
            let mut contract = request.contract.clone();
            contract.address = Some(format!("0x{}", request.api_name));
            contract.id = Some(format!("id-{}", request.api_name).into());
            contract.api_name = Some(request.api_name.to_owned());
            Ok(contract)
        }

        fn submit_transaction(&self, request: TransactionRequest<'_>) -> Result<TxnId, String> {
            self.record("submit_transaction", &format!("{}.{}", request.api_name, request.method))?;
            Ok(TxnId::new("txn-1"))
        }

        fn set_proxy(&self, request: ProxyUpdate<'_>) -> Result<String, String> {
            let id = request.proxy.id.as_deref().unwrap_or_default();
            self.record("set_proxy", id)?;
            Ok("OK".to_owned())
        }
    }

    fn library(name: &str) -> Action {
        Action {
            contract_name: Some(name.to_owned()),
            code: Some(format!("library {name} {{}}")),
            ..Action::new(ActionType::DeployLibrary)
        }
    }

    fn contract(name: &str, api: &str) -> Action {
        Action {
            contract_name: Some(name.to_owned()),
            api_name: Some(api.to_owned()),
            code: Some(format!("contract {name} {{}}")),
            ..Action::new(ActionType::DeployContract)
        }
    }

    fn workflow(actions: Vec<Action>) -> Workflow {
        Workflow::new("MyOrg", "myApp", "Quorum", actions)
    }

    #[test]
    fn constructor_dependency_injects_address() {
        let mut token = contract("Token", "token");
        token.dependencies = vec![Dependency {
            target_arg: Some("registry".to_owned()),
            ..Dependency::new(DependencyType::Constructor, "Registry")
        }];
        let mut wf = workflow(vec![contract("Registry", "registry"), token]);

        let deployer = Deployer::new(Recorder::default());
        let report = deployer.deploy(&mut wf).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.deployed, vec!["Registry", "Token"]);
        assert_eq!(wf.completed["Token"].args["registry"], "0xregistry");
        assert!(wf.updated_at.is_some());
    }

    #[test]
    fn constructor_dependency_without_target_fails() {
        let mut token = contract("Token", "token");
        token.dependencies = vec![Dependency::new(DependencyType::Constructor, "Registry")];
        let mut wf = workflow(vec![contract("Registry", "registry"), token]);

        let report = Deployer::new(Recorder::default()).deploy(&mut wf).unwrap();
        let halted = report.halted.unwrap();
        assert_eq!(halted.state, ActionState::FailedDependencies);
        assert!(halted.message.unwrap().contains("target_arg"));
        assert_eq!(wf.actions.len(), 1);
    }

    #[test]
    fn unresolved_parent_halts_with_dependency_failure() {
        let mut nft = contract("MyNft", "my-api");
        nft.dependencies = vec![Dependency::new(DependencyType::Library, "Missing")];
        let mut wf = workflow(vec![nft]);

        let report = Deployer::new(Recorder::default()).deploy(&mut wf).unwrap();
        assert_eq!(
            report.halted.unwrap().message.as_deref(),
            Some("Dependency on contract Missing cannot be resolved")
        );
        assert_eq!(wf.actions[0].action_state, ActionState::FailedDependencies);
        assert!(wf.completed.is_empty());
    }

    #[test]
    fn oversized_abi_type_halts_proxy_with_dependency_failure() {
        let mut token = contract("Token", "token");
        token.action_state = ActionState::Completed;
        token.contract = Some(Contract {
            address: Some("0x00000000000000000000000000000000000000aa".to_owned()),
            abi: Some(vec![json!({
                "type": "function",
                "name": "initialize",
                "inputs": [{"name": "xs", "type": "uint256[600000000000000000]"}],
                "outputs": []
            })]),
            ..Contract::default()
        });
        let proxy = Action {
            api_name: Some("my-proxy".to_owned()),
            dependencies: vec![Dependency {
                method_name: Some("initialize".to_owned()),
                method_args: Some(json!({"xs": []}).as_object().cloned().unwrap()),
                ..Dependency::new(DependencyType::Impl, "Token")
            }],
            ..Action::new(ActionType::DeployProxy)
        };
        let mut wf = workflow(vec![proxy]);
        wf.completed.insert("Token".to_owned(), token);

        let report = Deployer::new(Recorder::default()).deploy(&mut wf).unwrap();
        let halted = report.halted.unwrap();
        assert_eq!(halted.state, ActionState::FailedDependencies);
        assert!(halted.message.unwrap().contains("unsupported ABI type"));
        assert_eq!(wf.actions.len(), 1);
    }

    #[test]
    fn library_addresses_are_collected() {
        let mut nft = contract("MyNft", "my-api");
        nft.dependencies = vec![
            Dependency::new(DependencyType::Library, "A"),
            Dependency::new(DependencyType::Library, "B"),
        ];
        let mut wf = workflow(vec![library("A"), library("B"), nft]);

        Deployer::new(Recorder::default()).deploy(&mut wf).unwrap();
        let libs = &wf.completed["MyNft"].libraries;
        assert_eq!(libs["A"], "0xA");
        assert_eq!(libs["B"], "0xB");
    }

    #[test]
    fn method_call_uses_parent_contract_api() {
        let call = Action {
            api_name: Some("fallback-api".to_owned()),
            method_name: Some("mint".to_owned()),
            dependencies: vec![Dependency::new(DependencyType::Contract, "Token")],
            ..Action::new(ActionType::MethodCall)
        };
        let mut wf = workflow(vec![contract("Token", "token"), call]);

        let deployer = Deployer::new(Recorder::default());
        let report = deployer.deploy(&mut wf).unwrap();
        assert!(report.is_complete());
        assert!(deployer
            .executor()
            .calls()
            .contains(&"submit_transaction:token.mint".to_owned()));
        assert!(wf.completed.contains_key("fallback-api.mint"));
    }

    #[test]
    fn failed_method_call_keeps_message() {
        let call = Action {
            api_name: Some("token".to_owned()),
            method_name: Some("mint".to_owned()),
            ..Action::new(ActionType::MethodCall)
        };
        let mut wf = workflow(vec![call]);

        let report = Deployer::new(Recorder::failing(&["submit_transaction"]))
            .deploy(&mut wf)
            .unwrap();
        let halted = report.halted.unwrap();
        assert_eq!(halted.state, ActionState::FailedMethodCall);
        assert_eq!(halted.message.as_deref(), Some("submit_transaction failed"));
    }

    #[test]
    fn failed_deploy_keeps_error_and_design() {
        let mut wf = workflow(vec![contract("Token", "token")]);
        let report = Deployer::new(Recorder::failing(&["deploy_contract"]))
            .deploy(&mut wf)
            .unwrap();
        assert_eq!(report.halted.unwrap().state, ActionState::FailedComplete);
        let action = &wf.actions[0];
        assert_eq!(action.error_message.as_deref(), Some("deploy_contract failed"));
        assert_eq!(
            action.contract.as_ref().unwrap().design_id.as_ref().unwrap(),
            "design-Token"
        );

        // The retry deploys the existing design without compiling again.
        let deployer = Deployer::new(Recorder::default());
        assert!(deployer.deploy(&mut wf).unwrap().is_complete());
        assert_eq!(deployer.executor().calls(), vec!["deploy_contract:token"]);
    }

    #[test]
    fn library_with_contract_is_invalid_state() {
        let mut lib = library("A");
        lib.contract = Some(Contract::default());
        let mut wf = workflow(vec![lib]);

        let deployer = Deployer::new(Recorder::default());
        let report = deployer.deploy(&mut wf).unwrap();
        assert_eq!(report.halted.unwrap().state, ActionState::InvalidState);
        assert!(deployer.executor().calls().is_empty());
    }

    #[test]
    fn completed_action_is_moved_without_running() {
        let mut lib = library("A");
        lib.action_state = ActionState::Completed;
        lib.contract = Some(Contract {
            address: Some("0xA".to_owned()),
            ..Contract::default()
        });
        let mut wf = workflow(vec![lib, library("B")]);

        let deployer = Deployer::new(Recorder::default());
        let report = deployer.deploy(&mut wf).unwrap();
        assert_eq!(report.deployed, vec!["A", "B"]);
        assert_eq!(deployer.executor().calls(), vec!["deploy_library:B"]);
    }

    #[test]
    fn set_proxy_failure_retries_only_set_proxy() {
        let proxy = Action {
            api_name: Some("my-proxy".to_owned()),
            dependencies: vec![Dependency::new(DependencyType::Impl, "Token")],
            ..Action::new(ActionType::DeployProxy)
        };
        let mut wf = workflow(vec![contract("Token", "token"), proxy]);

        let report = Deployer::new(Recorder::failing(&["set_proxy"]))
            .deploy(&mut wf)
            .unwrap();
        let halted = report.halted.unwrap();
        assert_eq!(halted.name, "SIMBAProxy");
        assert_eq!(halted.state, ActionState::FailedSetProxy);
        let pending = &wf.actions[0];
        assert!(!pending.encode);
        assert_eq!(pending.args["_logic"], "0xtoken");
        assert_eq!(pending.args["_data"], "0x");

        let deployer = Deployer::new(Recorder::default());
        assert!(deployer.deploy(&mut wf).unwrap().is_complete());
        assert_eq!(deployer.executor().calls(), vec!["set_proxy:id-my-proxy"]);
        assert_eq!(wf.completed["SIMBAProxy"].action_state, ActionState::Completed);
    }

    #[test]
    fn proxy_code_is_base64_of_bundled_source() {
        let proxy = Action {
            api_name: Some("my-proxy".to_owned()),
            dependencies: vec![Dependency::new(DependencyType::Impl, "Token")],
            ..Action::new(ActionType::DeployProxy)
        };
        let mut wf = workflow(vec![contract("Token", "token"), proxy]);
        Deployer::new(Recorder::default()).deploy(&mut wf).unwrap();

        let code = wf.completed["SIMBAProxy"].code.clone().unwrap();
        let decoded = BASE64.decode(code).unwrap();
        assert_eq!(decoded, crate::executor::PROXY_SOURCE.as_bytes());
    }
}
