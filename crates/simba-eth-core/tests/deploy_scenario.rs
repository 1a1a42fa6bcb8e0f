use serde_json::{json, Map, Value};
use simba_eth_codec::{function_selector, to_hex_prefixed, ParamType, TxnId};
use simba_eth_core::{
    load_workflow, Action, save_workflow, ActionState, ActionType, CompileRequest, Contract,
    ContractDeployment, Dependency, DependencyType, Deployer, Executor, LibraryDeployment,
    ProxyUpdate, TransactionRequest, Workflow, WorkflowLock,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const ADMIN: &str = "0xa508dD875f10C33C52a8abb20E16fc68E981F186";

fn initialize_abi() -> Vec<Value> {
    let input = |name: &str, ty: &str| json!({"internalType": ty, "name": name, "type": ty});
    vec![json!({
        "inputs": [
            input("name", "string"),
            input("symbol", "string"),
            input("contractNamespace", "string"),
            input("admin", "address"),
            input("minter", "address"),
            input("pauser", "address"),
            input("maxSupply", "uint256"),
        ],
        "name": "initialize",
        "outputs": [],
        "stateMutability": "nonpayable",
        "type": "function"
    })]
}

fn initialize_metadata() -> Map<String, Value> {
    let params: Vec<Value> = [
        ("name", "string"),
        ("symbol", "string"),
        ("contractNamespace", "string"),
        ("admin", "address"),
        ("minter", "address"),
        ("pauser", "address"),
        ("maxSupply", "uint256"),
    ]
    .iter()
    .map(|(name, ty)| json!({"name": name, "type": ty}))
    .collect();
    json!({"contract": {"methods": {"initialize": {"params": params}}}})
        .as_object()
        .cloned()
        .unwrap()
}

/// Fails a different step on each of the first three runs.
#[derive(Default)]
struct ScenarioExecutor {
    run: AtomicUsize,
    proxy_args: Mutex<Option<Map<String, Value>>>,
}

impl ScenarioExecutor {
    fn next_run(&self) {
        self.run.fetch_add(1, Ordering::SeqCst);
    }

    fn run(&self) -> usize {
        self.run.load(Ordering::SeqCst)
    }
}

impl Executor for ScenarioExecutor {
    type Error = String;

    fn deploy_library(&self, _request: LibraryDeployment<'_>) -> Result<Contract, String> {
        let run = self.run();
        if run == 1 {
            return Err("could not deploy lib for some reason".to_owned());
        }
        Ok(Contract {
            address: Some(format!("0x{run}")),
            id: Some(run.to_string().into()),
            abi: Some(Vec::new()),
            metadata: Some(Map::new()),
            ..Contract::default()
        })
    }

    fn compile_contract(&self, request: CompileRequest<'_>) -> Result<Contract, String> {
        let run = self.run();
        if run == 2 {
            return Err("Could not compile design".to_owned());
        }
        let (abi, metadata) = if request.name == "SIMBAProxy" {
            (Vec::new(), Map::new())
        } else {
            (initialize_abi(), initialize_metadata())
        };
        Ok(Contract {
            design_id: Some(run.to_string().into()),
            abi: Some(abi),
            metadata: Some(metadata),
            ..Contract::default()
        })
    }

    fn deploy_contract(&self, request: ContractDeployment<'_>) -> Result<Contract, String> {
        let run = self.run();
        if run == 3 {
            return Err("Could not deploy contract".to_owned());
        }
        if request.api_name == "my-proxy" {
            *self.proxy_args.lock().unwrap() = Some(request.args.clone());
        }
        let mut contract = request.contract.clone();
        contract.address = Some(format!("0x{run}"));
        contract.id = Some(run.to_string().into());
        contract.api_name = Some(request.api_name.to_owned());
        Ok(contract)
    }

    fn submit_transaction(&self, _request: TransactionRequest<'_>) -> Result<TxnId, String> {
        Ok(TxnId::new(format!("0x{}", self.run())))
    }

    fn set_proxy(&self, _request: ProxyUpdate<'_>) -> Result<String, String> {
        Ok(format!("0x{}", self.run()))
    }
}

fn nft_workflow() -> Workflow {
    let library = |name: &str| Action {
        contract_name: Some(name.to_owned()),
        code: Some("hello world".to_owned()),
        ..Action::new(ActionType::DeployLibrary)
    };
    let nft = Action {
        contract_name: Some("MyNft".to_owned()),
        api_name: Some("my-api".to_owned()),
        code: Some("hello world".to_owned()),
        dependencies: vec![
            Dependency::new(DependencyType::Library, "DataUri"),
            Dependency::new(DependencyType::Library, "Metadata"),
        ],
        ..Action::new(ActionType::DeployContract)
    };
    let proxy = Action {
        api_name: Some("my-proxy".to_owned()),
        dependencies: vec![Dependency {
            method_name: Some("initialize".to_owned()),
            method_args: json!({
                "name": "My NFT",
                "symbol": "MNT",
                "contractNamespace": "com.simbachain",
                "admin": ADMIN,
                "minter": ADMIN,
                "pauser": ADMIN,
                "maxSupply": 0
            })
            .as_object()
            .cloned(),
            ..Dependency::new(DependencyType::Impl, "MyNft")
        }],
        ..Action::new(ActionType::DeployProxy)
    };
    let workflow = Workflow::new(
        "MyOrg",
        "myApp",
        "Quorum",
        vec![library("DataUri"), library("Metadata"), nft, proxy],
    );
    workflow.validate().unwrap();
    workflow
}

fn address_of(contract: Option<&Contract>) -> &str {
    contract.and_then(|c| c.address.as_deref()).unwrap()
}

#[test]
fn workflow_resumes_across_failed_runs() {
    let deployer = Deployer::new(ScenarioExecutor::default());
    let mut workflow = nft_workflow();

    // Run 1: the first library fails to deploy.
    deployer.executor().next_run();
    let report = deployer.deploy(&mut workflow).unwrap();
    assert!(workflow.completed.is_empty());
    assert_eq!(workflow.actions[0].action_state, ActionState::FailedComplete);
    assert_eq!(
        workflow.actions[0].error_message.as_deref(),
        Some("could not deploy lib for some reason")
    );
    assert_eq!(report.remaining, 4);

    // Run 2: both libraries deploy, compiling MyNft fails.
    deployer.executor().next_run();
    let report = deployer.deploy(&mut workflow).unwrap();
    assert_eq!(report.deployed, vec!["DataUri", "Metadata"]);
    assert_eq!(workflow.completed.len(), 2);
    assert_eq!(address_of(workflow.completed["DataUri"].contract.as_ref()), "0x2");
    assert_eq!(address_of(workflow.completed["Metadata"].contract.as_ref()), "0x2");
    assert_eq!(workflow.actions[0].action_state, ActionState::FailedCompile);

    // Run 3: MyNft compiles but its deploy fails.
    deployer.executor().next_run();
    deployer.deploy(&mut workflow).unwrap();
    assert_eq!(workflow.completed.len(), 2);
    let pending = &workflow.actions[0];
    assert_eq!(
        pending.contract.as_ref().unwrap().design_id.as_ref().unwrap(),
        "3"
    );
    assert_eq!(pending.action_state, ActionState::FailedComplete);
    assert_eq!(pending.error_message.as_deref(), Some("Could not deploy contract"));
    assert_eq!(pending.libraries["DataUri"], "0x2");

    // Run 4: everything completes.
    deployer.executor().next_run();
    let report = deployer.deploy(&mut workflow).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.deployed, vec!["MyNft", "SIMBAProxy"]);
    assert_eq!(workflow.completed.len(), 4);
    assert!(workflow.actions.is_empty());

    let nft = &workflow.completed["MyNft"];
    assert_eq!(nft.contract.as_ref().unwrap().design_id.as_ref().unwrap(), "3");
    assert_eq!(address_of(nft.contract.as_ref()), "0x4");
    assert_eq!(nft.action_state, ActionState::Completed);

    let proxy = &workflow.completed["SIMBAProxy"];
    assert_eq!(proxy.contract.as_ref().unwrap().design_id.as_ref().unwrap(), "4");
    assert_eq!(address_of(proxy.contract.as_ref()), "0x4");
    assert_eq!(proxy.action_state, ActionState::Completed);
    assert_eq!(address_of(proxy.impl_contract.as_ref()), "0x4");
}

#[test]
fn proxy_is_deployed_with_initializer_calldata() {
    let deployer = Deployer::new(ScenarioExecutor::default());
    let mut workflow = nft_workflow();
    for _ in 0..4 {
        deployer.executor().next_run();
        deployer.deploy(&mut workflow).unwrap();
    }

    let args = deployer.executor().proxy_args.lock().unwrap().clone().unwrap();
    assert_eq!(args["_logic"], "0x4");
    let data = args["_data"].as_str().unwrap();

    let types: Vec<ParamType> = [
        "string", "string", "string", "address", "address", "address", "uint256",
    ]
    .iter()
    .map(|t| t.parse().unwrap())
    .collect();
    let selector = to_hex_prefixed(&function_selector("initialize", &types));
    assert!(data.starts_with(&selector));
    assert!(data.contains(&ADMIN[2..].to_lowercase()));
}

#[test]
fn progress_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workflow.json");
    let deployer = Deployer::new(ScenarioExecutor::default());

    let mut workflow = nft_workflow();
    save_workflow(&path, &workflow).unwrap();
    for _ in 0..4 {
        let _lock = WorkflowLock::acquire(&path).unwrap();
        let mut current = load_workflow(&path).unwrap();
        deployer.executor().next_run();
        deployer.deploy(&mut current).unwrap();
        save_workflow(&path, &current).unwrap();
        workflow = current;
    }

    assert!(workflow.is_finished());
    let reloaded = load_workflow(&path).unwrap();
    assert_eq!(reloaded, workflow);
    assert!(reloaded.updated_at.is_some());
}
