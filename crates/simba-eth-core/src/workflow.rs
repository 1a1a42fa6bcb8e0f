use crate::calldata::PROXY_CONTRACT_NAME;
use crate::CoreError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use simba_eth_codec::{ContractId, DesignId};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("No actions defined.")]
    NoActions,
    #[error("field {field} is required for action type {action_type}")]
    MissingField {
        field: &'static str,
        action_type: ActionType,
    },
    #[error("initial action cannot have dependencies")]
    InitialDependencies,
    #[error("action '{action}' has a dependency with an empty parent")]
    EmptyParent { action: String },
    #[error("action '{action}' depends on '{parent}' which is not defined previously")]
    UnknownParent { action: String, parent: String },
    #[error("action '{0}' is a deploy proxy but has no dependency on an impl")]
    ProxyWithoutImpl(String),
    #[error("unsupported workflow format '{0}', expected .json or .toml")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyType {
    Library,
    Constructor,
    Contract,
    Impl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    DeployLibrary,
    DeployContract,
    MethodCall,
    DeployProxy,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::DeployLibrary => "DEPLOY_LIBRARY",
            ActionType::DeployContract => "DEPLOY_CONTRACT",
            ActionType::MethodCall => "METHOD_CALL",
            ActionType::DeployProxy => "DEPLOY_PROXY",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionState {
    #[default]
    Inited,
    Compiled,
    Completed,
    FailedCompile,
    FailedComplete,
    FailedMethodCall,
    FailedSetProxy,
    FailedDependencies,
    InvalidState,
}

impl ActionState {
    pub fn is_failed(self) -> bool {
        matches!(
            self,
            ActionState::FailedCompile
                | ActionState::FailedComplete
                | ActionState::FailedMethodCall
                | ActionState::FailedSetProxy
                | ActionState::FailedDependencies
                | ActionState::InvalidState
        )
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionState::Inited => "INITED",
            ActionState::Compiled => "COMPILED",
            ActionState::Completed => "COMPLETED",
            ActionState::FailedCompile => "FAILED_COMPILE",
            ActionState::FailedComplete => "FAILED_COMPLETE",
            ActionState::FailedMethodCall => "FAILED_METHOD_CALL",
            ActionState::FailedSetProxy => "FAILED_SET_PROXY",
            ActionState::FailedDependencies => "FAILED_DEPENDENCIES",
            ActionState::InvalidState => "INVALID_STATE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub dependency_type: DependencyType,
    pub parent: String,
    /// Constructor argument that receives the parent's address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_arg: Option<String>,
    /// Initializer called through the proxy (IMPL dependencies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_args: Option<Map<String, Value>>,
}

impl Dependency {
    pub fn new(dependency_type: DependencyType, parent: impl Into<String>) -> Self {
        Self {
            dependency_type,
            parent: parent.into(),
            target_arg: None,
            method_name: None,
            method_args: None,
        }
    }
}

/// A compiled design and/or deployed contract as known to the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ContractId>,
    /// Deployed address. Kept as the platform reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_id: Option<DesignId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_type: ActionType,
    /// Optional for proxies, which are always named `SIMBAProxy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub args: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action_state: ActionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<Contract>,
    /// For a proxy deploy, the implementation it wraps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impl_contract: Option<Contract>,
    #[serde(default = "default_encode", deserialize_with = "null_as_true")]
    pub encode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    /// Library name to deployed address, filled from LIBRARY dependencies.
    #[serde(default, deserialize_with = "null_as_default")]
    pub libraries: BTreeMap<String, String>,
}

impl Action {
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            contract_name: None,
            code: None,
            dependencies: Vec::new(),
            api_name: None,
            args: Map::new(),
            action_state: ActionState::Inited,
            contract: None,
            impl_contract: None,
            encode: true,
            error_message: None,
            method_name: None,
            libraries: BTreeMap::new(),
        }
    }

    /// Key under which the action is recorded in `Workflow::completed`.
    ///
    /// Method calls without a contract name are keyed `api_name.method_name`.
    pub fn name(&self) -> String {
        if let Some(name) = self.contract_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_owned();
        }
        match self.action_type {
            ActionType::DeployProxy => PROXY_CONTRACT_NAME.to_owned(),
            ActionType::MethodCall => format!(
                "{}.{}",
                self.api_name.as_deref().unwrap_or_default(),
                self.method_name.as_deref().unwrap_or_default()
            ),
            ActionType::DeployLibrary | ActionType::DeployContract => String::new(),
        }
    }

    fn check_required_fields(&self) -> Result<(), WorkflowError> {
        let required: &[&'static str] = match self.action_type {
            ActionType::DeployLibrary => &["contract_name", "code"],
            ActionType::DeployContract => &["contract_name", "code", "api_name"],
            ActionType::MethodCall => &["method_name", "api_name"],
            ActionType::DeployProxy => &["api_name"],
        };
        for &field in required {
            let value = match field {
                "contract_name" => &self.contract_name,
                "code" => &self.code,
                "api_name" => &self.api_name,
                _ => &self.method_name,
            };
            if !matches!(value.as_deref(), Some(v) if !v.is_empty()) {
                return Err(WorkflowError::MissingField {
                    field,
                    action_type: self.action_type,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// May be left empty in the document and filled from the platform config.
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub org: String,
    pub blockchain: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: BTreeMap<String, Action>,
    /// RFC 3339 time of the last deploy run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Workflow {
    pub fn new(
        org: impl Into<String>,
        app_name: impl Into<String>,
        blockchain: impl Into<String>,
        actions: Vec<Action>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            org: org.into(),
            blockchain: blockchain.into(),
            actions,
            storage: None,
            completed: BTreeMap::new(),
            updated_at: None,
        }
    }

    /// True once every action has moved into `completed`.
    pub fn is_finished(&self) -> bool {
        self.actions.is_empty() && !self.completed.is_empty()
    }

    /// Check action fields and the dependency graph.
    ///
    /// Parents may name a completed action or any action earlier in the list.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.actions.is_empty() && self.completed.is_empty() {
            return Err(WorkflowError::NoActions);
        }

        let mut previous: HashSet<String> = self.completed.keys().cloned().collect();
        for (i, action) in self.actions.iter().enumerate() {
            action.check_required_fields()?;
            let name = action.name();

            if i == 0 && self.completed.is_empty() && !action.dependencies.is_empty() {
                return Err(WorkflowError::InitialDependencies);
            }
            for dep in &action.dependencies {
                if dep.parent.is_empty() {
                    return Err(WorkflowError::EmptyParent { action: name });
                }
                if !previous.contains(&dep.parent) {
                    return Err(WorkflowError::UnknownParent {
                        action: name,
                        parent: dep.parent.clone(),
                    });
                }
            }
            let has_impl = action
                .dependencies
                .iter()
                .any(|d| d.dependency_type == DependencyType::Impl);
            if action.action_type == ActionType::DeployProxy && !has_impl {
                return Err(WorkflowError::ProxyWithoutImpl(name));
            }

            previous.insert(name);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowFormat {
    Json,
    Toml,
}

impl WorkflowFormat {
    pub fn from_path(path: &Path) -> Result<Self, WorkflowError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(WorkflowFormat::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(WorkflowFormat::Toml),
            other => Err(WorkflowError::UnsupportedFormat(
                other.unwrap_or_default().to_owned(),
            )),
        }
    }
}

/// Parse and validate a workflow document.
pub fn parse_workflow_str(input: &str, format: WorkflowFormat) -> Result<Workflow, CoreError> {
    let workflow: Workflow = match format {
        WorkflowFormat::Json => serde_json::from_str(input)?,
        WorkflowFormat::Toml => toml::from_str(input)?,
    };
    workflow.validate()?;
    Ok(workflow)
}

pub fn parse_workflow_file(path: impl AsRef<Path>) -> Result<Workflow, CoreError> {
    let path = path.as_ref();
    let format = WorkflowFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    parse_workflow_str(&content, format)
}

fn default_encode() -> bool {
    true
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}
