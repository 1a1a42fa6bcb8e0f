//! Reading deployment and transaction records returned by the platform.

use serde_json::Value;
use simba_eth_codec::ContractId;

/// Progress of a platform deployment or transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentState {
    Pending(String),
    Completed,
    Failed(String),
}

impl DeploymentState {
    /// Read `state` from a deployment or transaction record.
    ///
    /// `SUCCESS` is treated as completed. A failure message comes from
    /// `error`, falling back to the raw state.
    pub fn of(record: &Value) -> Self {
        let state = record
            .get("state")
            .and_then(Value::as_str)
            .unwrap_or("PENDING")
            .to_uppercase();
        match state.as_str() {
            "COMPLETED" | "SUCCESS" => Self::Completed,
            "FAILED" | "REJECTED" => {
                let message = match record.get("error") {
                    Some(Value::String(s)) if !s.is_empty() => s.clone(),
                    Some(Value::Null) | None => state.clone(),
                    Some(other) => other.to_string(),
                };
                Self::Failed(message)
            }
            _ => Self::Pending(state),
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending(_))
    }
}

/// Address of `name` in a completed deployment.
///
/// The primary entry wins when its name matches; otherwise the first
/// `deployment[]` entry with that name; otherwise the primary address.
pub fn deployed_address(deployment: &Value, name: &str) -> Option<String> {
    let primary = deployment.get("primary");
    let entry_name = |entry: &Value| entry.get("name").and_then(Value::as_str).map(str::to_owned);
    let address = |entry: &Value| {
        entry
            .get("address")
            .and_then(Value::as_str)
            .map(str::to_owned)
    };

    if let Some(primary) = primary {
        if entry_name(primary).as_deref() == Some(name) {
            if let Some(addr) = address(primary) {
                return Some(addr);
            }
        }
    }
    let from_list = deployment
        .get("deployment")
        .and_then(Value::as_array)
        .and_then(|entries| {
            entries
                .iter()
                .find(|e| entry_name(e).as_deref() == Some(name))
                .and_then(address)
        });
    from_list.or_else(|| primary.and_then(address))
}

/// The deployed contract id of the primary entry, if the record carries one.
pub fn deployed_contract_id(deployment: &Value) -> Option<ContractId> {
    let primary = deployment.get("primary")?;
    ["deployed_contract_id", "id"]
        .iter()
        .find_map(|key| ContractId::from_json(primary.get(*key)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Value {
        json!({
            "id": "d1",
            "state": "COMPLETED",
            "primary": {"name": "MyNft", "address": "0xprimary", "deployed_contract_id": "c9"},
            "deployment": [
                {"name": "DataUri", "address": "0xdata"},
                {"name": "Metadata", "address": "0xmeta"},
                {"name": "Metadata", "address": "0xsecond"}
            ]
        })
    }

    #[test]
    fn primary_match_wins() {
        assert_eq!(deployed_address(&record(), "MyNft").as_deref(), Some("0xprimary"));
    }

    #[test]
    fn first_named_entry_from_list() {
        assert_eq!(deployed_address(&record(), "Metadata").as_deref(), Some("0xmeta"));
    }

    #[test]
    fn unknown_name_falls_back_to_primary() {
        assert_eq!(deployed_address(&record(), "Other").as_deref(), Some("0xprimary"));
        assert_eq!(deployed_address(&json!({}), "Other"), None);
    }

    #[test]
    fn contract_id_from_primary() {
        assert_eq!(deployed_contract_id(&record()).as_deref(), Some("c9"));
        assert_eq!(
            deployed_contract_id(&json!({"primary": {"id": 4}})).as_deref(),
            Some("4")
        );
        assert_eq!(deployed_contract_id(&json!({})), None);
    }

    #[test]
    fn states() {
        assert_eq!(DeploymentState::of(&record()), DeploymentState::Completed);
        assert_eq!(
            DeploymentState::of(&json!({"state": "FAILED", "error": "out of gas"})),
            DeploymentState::Failed("out of gas".to_owned())
        );
        assert_eq!(
            DeploymentState::of(&json!({"state": "FAILED"})),
            DeploymentState::Failed("FAILED".to_owned())
        );
        let pending = DeploymentState::of(&json!({"state": "executing"}));
        assert_eq!(pending, DeploymentState::Pending("EXECUTING".to_owned()));
        assert!(!pending.is_final());
        assert!(!DeploymentState::of(&json!({})).is_final());
    }
}
