//! Initializer calldata for proxy deployments.

use crate::workflow::Contract;
use crate::CoreError;
use serde_json::{json, Map, Value};
use simba_eth_codec::{encode_function_call, to_hex_prefixed, ParamType};

/// Name every proxy action is recorded under.
pub const PROXY_CONTRACT_NAME: &str = "SIMBAProxy";

/// ABI-encode `method_name(args...)` against the implementation's ABI.
///
/// Arguments are looked up by parameter name. Their order follows
/// `metadata.contract.methods.<method>.params` when the design has it and the
/// ABI inputs otherwise. No method gives empty calldata (`0x`).
pub fn encode_calldata(
    contract: &Contract,
    method_name: Option<&str>,
    args: Option<&Map<String, Value>>,
) -> Result<String, CoreError> {
    let Some(method) = method_name.filter(|m| !m.is_empty()) else {
        return Ok("0x".to_owned());
    };

    let inputs = abi_inputs(contract, method)?;
    let params = metadata_params(contract, method).unwrap_or_else(|| inputs.clone());

    let mut types = Vec::with_capacity(params.len());
    let mut values = Vec::with_capacity(params.len());
    for (name, declared) in &params {
        let ty = inputs
            .iter()
            .find(|(input, _)| input == name)
            .map_or(declared.as_str(), |(_, ty)| ty.as_str());
        types.push(ty.parse::<ParamType>()?);
        let value = args.and_then(|a| a.get(name)).ok_or_else(|| {
            CoreError::Calldata(format!("missing argument '{name}' for {method}"))
        })?;
        values.push(value.clone());
    }

    let encoded = encode_function_call(method, &types, &values)?;
    Ok(to_hex_prefixed(&encoded))
}

/// Constructor arguments of the bundled proxy.
pub fn proxy_args(
    implementation: &Contract,
    method_name: Option<&str>,
    args: Option<&Map<String, Value>>,
) -> Result<Map<String, Value>, CoreError> {
    let logic = implementation
        .address
        .as_deref()
        .ok_or_else(|| CoreError::Calldata("implementation has no address".to_owned()))?;
    let data = encode_calldata(implementation, method_name, args)?;
    let mut out = Map::new();
    out.insert("_logic".to_owned(), json!(logic));
    out.insert("_data".to_owned(), json!(data));
    Ok(out)
}

/// `(name, type)` of the inputs of the named function in the ABI.
fn abi_inputs(contract: &Contract, method: &str) -> Result<Vec<(String, String)>, CoreError> {
    let entry = contract
        .abi
        .iter()
        .flatten()
        .find(|entry| {
            let is_function = !matches!(
                entry.get("type").and_then(Value::as_str),
                Some(t) if t != "function"
            );
            is_function && entry.get("name").and_then(Value::as_str) == Some(method)
        })
        .ok_or_else(|| CoreError::Calldata(format!("method '{method}' not found in ABI")))?;

    Ok(entry
        .get("inputs")
        .and_then(Value::as_array)
        .map(|inputs| inputs.iter().map(name_and_type).collect())
        .unwrap_or_default())
}

fn metadata_params(contract: &Contract, method: &str) -> Option<Vec<(String, String)>> {
    let params = contract
        .metadata
        .as_ref()?
        .get("contract")?
        .get("methods")?
        .get(method)?
        .get("params")?
        .as_array()?;
    Some(params.iter().map(name_and_type).collect())
}

fn name_and_type(param: &Value) -> (String, String) {
    let field = |key: &str| {
        param
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };
    (field("name"), field("type"))
}
