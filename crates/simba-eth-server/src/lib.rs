//! In-memory mock of the SIMBA platform REST API.
//!
//! Serves the endpoints the simba-eth client uses for workflow deploys:
//! artifact upload, design compile and deploy, deployment polling, method
//! calls with transaction polling, and proxy updates. Solidity is never
//! compiled; designs get the ABI and metadata registered for their contract
//! name, or empty ones.
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info, warn};

/// A parsed API route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Health,
    CreateArtifact { org: String },
    GetDeployment { org: String, id: String },
    Compile { org: String },
    DeployDesign { org: String, design_id: String },
    CallMethod { org: String, app: String, api: String, method: String },
    GetTransaction { org: String, app: String, id: String },
    SetProxy { org: String, contract_id: String },
}

/// Where a one-shot failure is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    /// Reject the next `deployed_artifacts/create` call with 400.
    CreateArtifact,
    /// Reject the next compile call with 400.
    Compile,
    /// Reject the next design deploy call with 400.
    DeployDesign,
    /// The next deployment created reports `FAILED`.
    Deployment,
    /// Reject the next method call with 400.
    CallMethod,
    /// The next transaction created reports `FAILED`.
    Transaction,
    /// Reject the next proxy update with 400.
    SetProxy,
}

/// Split `path` into an endpoint the mock serves.
pub fn parse_route(method: &Method, path: &str) -> Option<Endpoint> {
    fn owned(s: &str) -> String {
        s.to_owned()
    }

    let path = path.split('?').next().unwrap_or_default();
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    match (method, parts.as_slice()) {
        (Method::Get, ["health"]) => Some(Endpoint::Health),
        (Method::Post, ["v2", "organisations", org, "deployed_artifacts", "create"]) => {
            Some(Endpoint::CreateArtifact { org: owned(org) })
        }
        (Method::Get, ["v2", "organisations", org, "deployments", id]) => {
            Some(Endpoint::GetDeployment {
                org: owned(org),
                id: owned(id),
            })
        }
        (Method::Post, ["v2", "organisations", org, "contract_designs", "compile"]) => {
            Some(Endpoint::Compile { org: owned(org) })
        }
        (Method::Post, ["v2", "organisations", org, "contract_designs", design_id, "deploy"]) => {
            Some(Endpoint::DeployDesign {
                org: owned(org),
                design_id: owned(design_id),
            })
        }
        (
            Method::Post,
            ["v2", "organisations", org, "applications", app, "contract", api, method],
        ) => Some(Endpoint::CallMethod {
            org: owned(org),
            app: owned(app),
            api: owned(api),
            method: owned(method),
        }),
        (Method::Get, ["v2", "organisations", org, "applications", app, "transactions", id]) => {
            Some(Endpoint::GetTransaction {
                org: owned(org),
                app: owned(app),
                id: owned(id),
            })
        }
        (Method::Put, ["v2", "organisations", org, "deployed_contracts", contract_id, "proxy"]) => {
            Some(Endpoint::SetProxy {
                org: owned(org),
                contract_id: owned(contract_id),
            })
        }
        _ => None,
    }
}

/// A contract the mock has "deployed".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployedContract {
    pub id: String,
    pub org: String,
    pub name: String,
    pub address: String,
    pub app_name: Option<String>,
    pub api_name: Option<String>,
    pub design_id: Option<String>,
    pub args: Map<String, Value>,
    pub libraries: BTreeMap<String, String>,
    pub implementation: Option<String>,
}

/// A request the mock accepted, for assertions in tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Value,
}

#[derive(Debug, Clone)]
struct Design {
    id: String,
    name: String,
    abi: Vec<Value>,
    metadata: Map<String, Value>,
    libraries: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct Tracked {
    record: Value,
    polls_left: u32,
    failure: Option<String>,
}

#[derive(Default)]
struct PlatformState {
    next_id: u64,
    pending_polls: u32,
    registered: HashMap<String, (Vec<Value>, Map<String, Value>)>,
    designs: HashMap<String, Design>,
    contracts: BTreeMap<String, DeployedContract>,
    deployments: HashMap<String, Tracked>,
    transactions: HashMap<String, Tracked>,
    failures: HashMap<FailurePoint, String>,
    requests: Vec<RecordedRequest>,
}

impl PlatformState {
    fn next(&mut self, prefix: &str) -> (String, u64) {
        self.next_id += 1;
        (format!("{prefix}-{}", self.next_id), self.next_id)
    }

    fn take_failure(&mut self, point: FailurePoint) -> Option<String> {
        self.failures.remove(&point)
    }

    fn track(&mut self, record: Value, failure: Option<String>) -> Tracked {
        Tracked {
            record,
            polls_left: self.pending_polls,
            failure,
        }
    }
}

/// An HTTP-free reply: status plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn created(body: Value) -> Self {
        Self { status: 201, body }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }
}

/// The mock platform's state and request handling.
#[derive(Default)]
pub struct Platform {
    token: Option<String>,
    state: Mutex<PlatformState>,
}

impl Platform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `Authorization: Bearer <token>` on every API route.
    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_owned());
        self
    }

    /// Deployments and transactions report `PENDING` this many times first.
    #[must_use]
    pub fn with_pending_polls(self, polls: u32) -> Self {
        self.lock().pending_polls = polls;
        self
    }

    fn lock(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ABI and metadata returned when a design for `contract_name` is compiled.
    pub fn register_design(&self, contract_name: &str, abi: Vec<Value>, metadata: Map<String, Value>) {
        self.lock()
            .registered
            .insert(contract_name.to_owned(), (abi, metadata));
    }

    /// Fail the next request (or record) at `point` with `message`.
    pub fn fail_next(&self, point: FailurePoint, message: &str) {
        self.lock().failures.insert(point, message.to_owned());
    }

    pub fn set_pending_polls(&self, polls: u32) {
        self.lock().pending_polls = polls;
    }

    pub fn contracts(&self) -> Vec<DeployedContract> {
        self.lock().contracts.values().cloned().collect()
    }

    pub fn contract_by_api(&self, api_name: &str) -> Option<DeployedContract> {
        self.lock()
            .contracts
            .values()
            .find(|c| c.api_name.as_deref() == Some(api_name))
            .cloned()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Handle one request without any HTTP plumbing.
    pub fn handle(
        &self,
        method: &Method,
        path: &str,
        authorization: Option<&str>,
        body: &[u8],
    ) -> Reply {
        let Some(endpoint) = parse_route(method, path) else {
            return Reply::error(404, format!("no route for {method} {path}"));
        };
        if endpoint == Endpoint::Health {
            return Reply::ok(json!({"status": "ok"}));
        }
        if let Some(ref token) = self.token {
            let expected = format!("Bearer {token}");
            if authorization != Some(expected.as_str()) {
                return Reply {
                    status: 401,
                    body: json!({"detail": "Invalid token."}),
                };
            }
        }
        let body = if body.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice(body) {
                Ok(v) => v,
                Err(e) => return Reply::error(400, format!("invalid JSON body: {e}")),
            }
        };

        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            method: method.to_string(),
            path: path.to_owned(),
            body: body.clone(),
        });
        match endpoint {
            Endpoint::Health => Reply::ok(json!({"status": "ok"})),
            Endpoint::CreateArtifact { org } => create_artifact(&mut state, &org, &body),
            Endpoint::GetDeployment { id, .. } => poll(&mut state.deployments, &id, "deployment"),
            Endpoint::Compile { .. } => compile(&mut state, &body),
            Endpoint::DeployDesign { org, design_id } => {
                deploy_design(&mut state, &org, &design_id, &body)
            }
            Endpoint::CallMethod {
                org,
                app,
                api,
                method: name,
            } => call_method(&mut state, &org, &app, &api, &name, &body),
            Endpoint::GetTransaction { id, .. } => poll(&mut state.transactions, &id, "transaction"),
            Endpoint::SetProxy { contract_id, .. } => set_proxy(&mut state, &contract_id, &body),
        }
    }
}

fn str_field<'a>(body: &'a Value, key: &str) -> Result<&'a str, Reply> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Reply::error(400, format!("'{key}' is required")))
}

fn decode_code(body: &Value) -> Result<String, Reply> {
    let code = str_field(body, "code")?;
    let bytes = STANDARD
        .decode(code)
        .map_err(|_| Reply::error(400, "code is not valid base64"))?;
    String::from_utf8(bytes).map_err(|_| Reply::error(400, "code is not UTF-8"))
}

fn object_field(body: &Value, key: &str) -> Map<String, Value> {
    match body.get(key) {
        Some(Value::Object(m)) => m.clone(),
        _ => Map::new(),
    }
}

fn libraries_field(body: &Value) -> BTreeMap<String, String> {
    object_field(body, "libraries")
        .into_iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_owned())))
        .collect()
}

fn address_for(n: u64) -> String {
    format!("0x{n:040x}")
}

fn new_deployment(
    state: &mut PlatformState,
    contract: DeployedContract,
    entries: Vec<Value>,
) -> String {
    let (deployment_id, _) = state.next("deployment");
    let failure = state.take_failure(FailurePoint::Deployment);
    let record = json!({
        "id": deployment_id,
        "state": "COMPLETED",
        "primary": {
            "name": contract.api_name.as_deref().unwrap_or(&contract.name),
            "address": contract.address,
            "deployed_contract_id": contract.id,
        },
        "deployment": entries,
    });
    let tracked = state.track(record, failure);
    state.deployments.insert(deployment_id.clone(), tracked);
    if state.deployments[&deployment_id].failure.is_none() {
        state.contracts.insert(contract.id.clone(), contract);
    }
    deployment_id
}

fn create_artifact(state: &mut PlatformState, org: &str, body: &Value) -> Reply {
    if let Some(message) = state.take_failure(FailurePoint::CreateArtifact) {
        return Reply::error(400, message);
    }
    let parsed = str_field(body, "lib_name").and_then(|lib| Ok((lib, decode_code(body)?)));
    let (lib_name, code) = match parsed {
        Ok(v) => v,
        Err(reply) => return reply,
    };
    let (contract_id, n) = state.next("contract");
    let contract = DeployedContract {
        id: contract_id,
        org: org.to_owned(),
        name: lib_name.to_owned(),
        address: address_for(n),
        app_name: body.get("app_name").and_then(Value::as_str).map(str::to_owned),
        api_name: None,
        design_id: None,
        args: Map::new(),
        libraries: BTreeMap::new(),
        implementation: None,
    };
    info!("library {lib_name} ({} bytes) at {}", code.len(), contract.address);
    let entry = json!({"name": lib_name, "address": contract.address});
    let deployment_id = new_deployment(state, contract, vec![entry]);
    Reply::created(json!({ "deployment_id": deployment_id }))
}

fn compile(state: &mut PlatformState, body: &Value) -> Reply {
    if let Some(message) = state.take_failure(FailurePoint::Compile) {
        return Reply::error(400, message);
    }
    let parsed = str_field(body, "name").and_then(|name| Ok((name, decode_code(body)?)));
    let (name, _code) = match parsed {
        Ok(v) => v,
        Err(reply) => return reply,
    };
    let target = body
        .get("target_contract")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(name);
    let (abi, metadata) = state
        .registered
        .get(target)
        .or_else(|| state.registered.get(name))
        .cloned()
        .unwrap_or_default();

    let (id, _) = state.next("design");
    let design = Design {
        id: id.clone(),
        name: target.to_owned(),
        abi,
        metadata,
        libraries: libraries_field(body),
    };
    info!("compiled {} as {id}", design.name);
    let reply = json!({
        "id": id,
        "name": design.name,
        "abi": design.abi,
        "metadata": design.metadata,
    });
    state.designs.insert(id, design);
    Reply::created(reply)
}

fn deploy_design(state: &mut PlatformState, org: &str, design_id: &str, body: &Value) -> Reply {
    if let Some(message) = state.take_failure(FailurePoint::DeployDesign) {
        return Reply::error(400, message);
    }
    let Some(design) = state.designs.get(design_id).cloned() else {
        return Reply::error(404, format!("design {design_id} not found"));
    };
    let api_name = match str_field(body, "api_name") {
        Ok(api) => api,
        Err(reply) => return reply,
    };
    if state
        .contracts
        .values()
        .any(|c| c.org == org && c.api_name.as_deref() == Some(api_name))
    {
        return Reply::error(400, format!("api_name '{api_name}' is already in use"));
    }

    let (contract_id, n) = state.next("contract");
    let contract = DeployedContract {
        id: contract_id,
        org: org.to_owned(),
        name: design.name.clone(),
        address: address_for(n),
        app_name: body.get("app_name").and_then(Value::as_str).map(str::to_owned),
        api_name: Some(api_name.to_owned()),
        design_id: Some(design.id.clone()),
        args: object_field(body, "args"),
        libraries: design.libraries.clone(),
        implementation: None,
    };
    info!("deployed {} as '{api_name}' at {}", design.name, contract.address);
    let entry = json!({"name": design.name, "address": contract.address});
    let deployment_id = new_deployment(state, contract, vec![entry]);
    Reply::created(json!({ "deployment_id": deployment_id }))
}

fn call_method(
    state: &mut PlatformState,
    org: &str,
    app: &str,
    api: &str,
    method: &str,
    body: &Value,
) -> Reply {
    if let Some(message) = state.take_failure(FailurePoint::CallMethod) {
        return Reply::error(400, message);
    }
    if !state
        .contracts
        .values()
        .any(|c| c.org == org && c.api_name.as_deref() == Some(api))
    {
        return Reply::error(404, format!("no contract API '{api}' in {app}"));
    }
    let (id, _) = state.next("txn");
    let failure = state.take_failure(FailurePoint::Transaction);
    let record = json!({
        "id": id,
        "state": "COMPLETED",
        "method": method,
        "inputs": body,
    });
    info!("{api}.{method} submitted as {id}");
    let tracked = state.track(record, failure);
    state.transactions.insert(id.clone(), tracked);
    Reply::created(json!({ "id": id, "state": "SUBMITTED" }))
}

fn poll(records: &mut HashMap<String, Tracked>, id: &str, what: &str) -> Reply {
    let Some(tracked) = records.get_mut(id) else {
        return Reply::error(404, format!("{what} {id} not found"));
    };
    let mut record = tracked.record.clone();
    if tracked.polls_left > 0 {
        tracked.polls_left -= 1;
        record["state"] = json!("PENDING");
    } else if let Some(ref message) = tracked.failure {
        record["state"] = json!("FAILED");
        record["error"] = json!(message);
    }
    debug!("{what} {id} is {}", record["state"]);
    Reply::ok(record)
}

fn set_proxy(state: &mut PlatformState, contract_id: &str, body: &Value) -> Reply {
    if let Some(message) = state.take_failure(FailurePoint::SetProxy) {
        return Reply::error(400, message);
    }
    let implementation = match str_field(body, "implementation") {
        Ok(i) => i.to_owned(),
        Err(reply) => return reply,
    };
    if !state.contracts.contains_key(&implementation) {
        return Reply::error(404, format!("implementation {implementation} not found"));
    }
    let Some(proxy) = state.contracts.get_mut(contract_id) else {
        return Reply::error(404, format!("contract {contract_id} not found"));
    };
    proxy.implementation = Some(implementation.clone());
    info!("proxy {contract_id} now points at {implementation}");
    Reply::ok(json!({ "id": contract_id, "implementation": implementation }))
}

fn read_body(req: &mut tiny_http::Request) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    if req.as_reader().read_to_end(&mut body).is_ok() {
        Some(body)
    } else {
        None
    }
}

fn respond_json(req: tiny_http::Request, reply: &Reply) {
    let mut response = Response::from_string(reply.body.to_string())
        .with_status_code(StatusCode(reply.status));
    if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
        response = response.with_header(header);
    }
    let _ = req.respond(response);
}

/// Handle a single HTTP request against `platform`.
pub fn handle_request(platform: &Platform, mut req: tiny_http::Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    debug!("{method} {url}");

    let authorization = req
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"))
        .map(|h| h.value.as_str().to_owned());
    let Some(body) = read_body(&mut req) else {
        respond_json(req, &Reply::error(500, "read error"));
        return;
    };
    let reply = platform.handle(&method, &url, authorization.as_deref(), &body);
    if reply.status >= 400 {
        warn!("{method} {url} -> {}: {}", reply.status, reply.body);
    }
    respond_json(req, &reply);
}

/// Start the server loop, blocking the current thread.
pub fn run_server(
    platform: &Platform,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let server = Server::http(addr)?;
    for request in server.incoming_requests() {
        handle_request(platform, request);
    }
    Ok(())
}

/// A test helper that starts the mock platform on a random port in a background thread.
///
/// Dropping the `TestServer` stops the server.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    platform: Arc<Platform>,
    server: Arc<Server>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl TestServer {
    pub fn start() -> Self {
        Self::start_with(Platform::new())
    }

    /// Binds to `127.0.0.1:0` and serves `platform`.
    pub fn start_with(platform: Platform) -> Self {
        let server =
            Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let url = format!("http://127.0.0.1:{port}");

        let platform = Arc::new(platform);
        let srv = Arc::clone(&server);
        let shared = Arc::clone(&platform);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                handle_request(&shared, request);
            }
        });

        Self {
            url,
            port,
            platform,
            server,
            handle: Some(handle),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(s: &str) -> String {
        STANDARD.encode(s)
    }

    fn post(platform: &Platform, path: &str, body: &Value) -> Reply {
        platform.handle(&Method::Post, path, None, body.to_string().as_bytes())
    }

    fn get(platform: &Platform, path: &str) -> Reply {
        platform.handle(&Method::Get, path, None, b"")
    }

    const ORG: &str = "/v2/organisations/acme";

    #[test]
    fn routes() {
        assert_eq!(parse_route(&Method::Get, "/health"), Some(Endpoint::Health));
        assert_eq!(
            parse_route(&Method::Post, "/v2/organisations/acme/contract_designs/d-1/deploy/"),
            Some(Endpoint::DeployDesign {
                org: "acme".to_owned(),
                design_id: "d-1".to_owned()
            })
        );
        assert_eq!(
            parse_route(&Method::Post, "/v2/organisations/o/applications/app/contract/tok/mint/"),
            Some(Endpoint::CallMethod {
                org: "o".to_owned(),
                app: "app".to_owned(),
                api: "tok".to_owned(),
                method: "mint".to_owned()
            })
        );
        assert_eq!(
            parse_route(&Method::Get, "/v2/organisations/o/deployments/7/?x=1"),
            Some(Endpoint::GetDeployment {
                org: "o".to_owned(),
                id: "7".to_owned()
            })
        );
        assert!(parse_route(&Method::Get, "/v2/organisations/o/contract_designs/compile/").is_none());
        assert!(parse_route(&Method::Post, "/v1/anything").is_none());
    }

    #[test]
    fn library_deploys_with_deterministic_address() {
        let platform = Platform::new();
        let reply = post(
            &platform,
            &format!("{ORG}/deployed_artifacts/create/"),
            &json!({"lib_name": "DataUri", "code": b64("library DataUri {}")}),
        );
        assert_eq!(reply.status, 201);
        let id = reply.body["deployment_id"].as_str().unwrap().to_owned();

        let deployment = get(&platform, &format!("{ORG}/deployments/{id}/"));
        assert_eq!(deployment.body["state"], "COMPLETED");
        assert_eq!(deployment.body["primary"]["name"], "DataUri");
        assert_eq!(
            deployment.body["primary"]["address"],
            "0x0000000000000000000000000000000000000001"
        );
    }

    #[test]
    fn code_must_be_base64() {
        let platform = Platform::new();
        let reply = post(
            &platform,
            &format!("{ORG}/deployed_artifacts/create/"),
            &json!({"lib_name": "DataUri", "code": "library {"}),
        );
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body["error"], "code is not valid base64");
    }

    #[test]
    fn compile_returns_registered_design() {
        let platform = Platform::new();
        let abi = vec![json!({"type": "function", "name": "mint", "inputs": []})];
        platform.register_design("Token", abi.clone(), Map::new());
        let reply = post(
            &platform,
            &format!("{ORG}/contract_designs/compile/"),
            &json!({"name": "Token", "code": b64("contract Token {}"), "target_contract": "Token"}),
        );
        assert_eq!(reply.status, 201);
        assert_eq!(reply.body["abi"], Value::Array(abi));

        let unknown = post(
            &platform,
            &format!("{ORG}/contract_designs/compile/"),
            &json!({"name": "Other", "code": b64("contract Other {}")}),
        );
        assert_eq!(unknown.body["abi"], json!([]));
    }

    #[test]
    fn pending_polls_then_complete() {
        let platform = Platform::new().with_pending_polls(2);
        let reply = post(
            &platform,
            &format!("{ORG}/deployed_artifacts/create/"),
            &json!({"lib_name": "L", "code": b64("library L {}")}),
        );
        let id = reply.body["deployment_id"].as_str().unwrap().to_owned();
        let path = format!("{ORG}/deployments/{id}/");
        assert_eq!(get(&platform, &path).body["state"], "PENDING");
        assert_eq!(get(&platform, &path).body["state"], "PENDING");
        assert_eq!(get(&platform, &path).body["state"], "COMPLETED");
    }

    #[test]
    fn injected_failures_are_one_shot() {
        let platform = Platform::new();
        platform.fail_next(FailurePoint::Compile, "solc exploded");
        let body = json!({"name": "T", "code": b64("contract T {}")});
        let path = format!("{ORG}/contract_designs/compile/");
        let first = post(&platform, &path, &body);
        assert_eq!(first.status, 400);
        assert_eq!(first.body["error"], "solc exploded");
        assert_eq!(post(&platform, &path, &body).status, 201);

        platform.fail_next(FailurePoint::Deployment, "out of gas");
        let reply = post(
            &platform,
            &format!("{ORG}/deployed_artifacts/create/"),
            &json!({"lib_name": "L", "code": b64("library L {}")}),
        );
        let id = reply.body["deployment_id"].as_str().unwrap().to_owned();
        let deployment = get(&platform, &format!("{ORG}/deployments/{id}/"));
        assert_eq!(deployment.body["state"], "FAILED");
        assert_eq!(deployment.body["error"], "out of gas");
        assert!(platform.contracts().is_empty());
    }

    #[test]
    fn method_call_needs_a_deployed_api() {
        let platform = Platform::new();
        let reply = post(
            &platform,
            &format!("{ORG}/applications/app/contract/token/mint/"),
            &json!({"to": "0x1"}),
        );
        assert_eq!(reply.status, 404);
    }

    #[test]
    fn token_is_enforced_when_configured() {
        let platform = Platform::new().with_token("t0k");
        let path = format!("{ORG}/deployments/nope/");
        assert_eq!(platform.handle(&Method::Get, &path, None, b"").status, 401);
        assert_eq!(
            platform
                .handle(&Method::Get, &path, Some("Bearer t0k"), b"")
                .status,
            404
        );
        assert_eq!(platform.handle(&Method::Get, "/health", None, b"").status, 200);
    }

    #[test]
    fn requests_are_recorded() {
        let platform = Platform::new();
        post(&platform, &format!("{ORG}/contract_designs/compile/"), &json!({"name": "T", "code": b64("x")}));
        let requests = platform.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].body["name"], "T");
    }
}
