use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// The kind of condition a strategy checks.
///
/// Displays and serializes with the wire names used by the remote authority,
/// e.g. `VALUE_VALIDATION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, IntoStaticStr)]
pub enum StrategyType {
    #[serde(rename = "VALUE_VALIDATION")]
    #[strum(serialize = "VALUE_VALIDATION")]
    Value,

    #[serde(rename = "NUMERIC_VALIDATION")]
    #[strum(serialize = "NUMERIC_VALIDATION")]
    Numeric,

    #[serde(rename = "NETWORK_VALIDATION")]
    #[strum(serialize = "NETWORK_VALIDATION")]
    Network,

    #[serde(rename = "TIME_VALIDATION")]
    #[strum(serialize = "TIME_VALIDATION")]
    Time,

    #[serde(rename = "DATE_VALIDATION")]
    #[strum(serialize = "DATE_VALIDATION")]
    Date,

    #[serde(rename = "REGEX_VALIDATION")]
    #[strum(serialize = "REGEX_VALIDATION")]
    Regex,

    #[serde(rename = "PAYLOAD_VALIDATION")]
    #[strum(serialize = "PAYLOAD_VALIDATION")]
    Payload,
}

/// Comparison applied by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Equal,
    NotEqual,
    Exist,
    NotExist,
    Greater,
    Lower,
    Between,
    HasOne,
    HasAll,
}

/// One typed condition attached to a config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub strategy: StrategyType,
    pub operation: Operation,

    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<String>,

    #[serde(default)]
    pub activated: bool,
}

/// Relay settings of a config. Only the activation flag matters locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Relay {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub activated: bool,
}

/// A named switch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub key: String,
    pub activated: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay: Option<Relay>,

    #[serde(deserialize_with = "nullable")]
    pub strategies: Vec<StrategyConfig>,

    #[serde(deserialize_with = "nullable")]
    pub components: Vec<String>,
}

impl Config {
    /// Returns `true` if the config delegates to a relay.
    #[must_use]
    pub fn relay_enabled(&self) -> bool {
        self.relay.as_ref().is_some_and(|relay| relay.activated)
    }
}

/// An ordered set of configs that can be switched off together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub name: String,
    pub activated: bool,

    #[serde(rename = "config", deserialize_with = "nullable")]
    pub configs: Vec<Config>,
}

/// Root of the rule tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Domain {
    pub name: String,
    pub version: u64,
    pub activated: bool,

    #[serde(rename = "group", deserialize_with = "nullable")]
    pub groups: Vec<Group>,
}

impl Domain {
    /// Find the config for `key`.
    ///
    /// Groups are scanned in declaration order and the first group holding the
    /// key wins; nothing enforces uniqueness of keys across groups.
    #[must_use]
    pub fn find_config(&self, key: &str) -> Option<(&Group, &Config)> {
        self.groups
            .iter()
            .find_map(|group| group.configs.iter().find(|config| config.key == key).map(|config| (group, config)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SnapshotData {
    #[serde(default)]
    domain: Domain,
}

/// A complete rule tree as loaded from the remote authority or a snapshot file.
///
/// A version of `0` marks a placeholder that was never fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    data: SnapshotData,
}

impl Snapshot {
    #[must_use]
    pub fn new(domain: Domain) -> Self {
        Self {
            data: SnapshotData { domain },
        }
    }

    /// An empty, never-fetched snapshot.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.data.domain.version
    }

    #[must_use]
    pub const fn domain(&self) -> &Domain {
        &self.data.domain
    }

    /// Parse a snapshot document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::snapshot(format!("malformed snapshot document: {e}")))
    }

    /// Render the snapshot document as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::snapshot(format!("unable to serialize snapshot: {e}")))
    }
}

/// Treat an explicit `null` the same as a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    const DOCUMENT: &str = r#"{
        "data": {
            "domain": {
                "name": "Business",
                "version": 12,
                "activated": true,
                "group": [
                    {
                        "name": "Rollout 2020",
                        "activated": true,
                        "config": [
                            {
                                "key": "FF2FOR2020",
                                "activated": true,
                                "relay": { "type": "VALIDATION", "activated": false },
                                "strategies": [
                                    {
                                        "strategy": "VALUE_VALIDATION",
                                        "activated": true,
                                        "operation": "EXIST",
                                        "values": ["USER_1", "USER_2"]
                                    }
                                ],
                                "components": ["benchmark"]
                            },
                            {
                                "key": "FF2FOR2021",
                                "activated": false,
                                "relay": null,
                                "strategies": null
                            }
                        ]
                    },
                    {
                        "name": "Shadow",
                        "activated": false,
                        "config": [{ "key": "FF2FOR2020", "activated": false }]
                    }
                ]
            }
        }
    }"#;

    #[test]
    fn parses_wire_document() {
        let snapshot = Snapshot::from_json(DOCUMENT).unwrap();
        assert_eq!(snapshot.version(), 12);

        let domain = snapshot.domain();
        assert_eq!(domain.name, "Business");
        assert_eq!(domain.groups.len(), 2);

        let (group, config) = domain.find_config("FF2FOR2020").unwrap();
        assert_eq!(group.name, "Rollout 2020");
        assert!(!config.relay_enabled());
        assert_eq!(config.strategies[0].strategy, StrategyType::Value);
        assert_eq!(config.strategies[0].operation, Operation::Exist);
        assert_eq!(config.components, vec!["benchmark"]);
    }

    #[test]
    fn null_collections_become_empty() {
        let snapshot = Snapshot::from_json(DOCUMENT).unwrap();
        let (_, config) = snapshot.domain().find_config("FF2FOR2021").unwrap();
        assert!(config.strategies.is_empty());
        assert!(config.relay.is_none());
    }

    #[test]
    fn first_group_wins_for_duplicate_keys() {
        let snapshot = Snapshot::from_json(DOCUMENT).unwrap();
        let (group, config) = snapshot.domain().find_config("FF2FOR2020").unwrap();
        assert!(group.activated);
        assert!(config.activated);
    }

    #[test]
    fn placeholder_is_version_zero() {
        let placeholder = Snapshot::placeholder();
        assert_eq!(placeholder.version(), 0);
        assert!(!placeholder.domain().activated);

        let text = placeholder.to_json().unwrap();
        let reparsed = Snapshot::from_json(&text).unwrap();
        assert_eq!(reparsed, placeholder);
    }

    #[test]
    fn minimal_document_parses() {
        let snapshot = Snapshot::from_json(r#"{ "data": { "domain": { "version": 0 } } }"#).unwrap();
        assert_eq!(snapshot.version(), 0);
        assert!(snapshot.domain().groups.is_empty());
    }

    #[test]
    fn malformed_document_is_snapshot_error() {
        let err = Snapshot::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::SnapshotLoad(_)));
    }

    #[test]
    fn strategy_names_round_trip() {
        assert_eq!(StrategyType::Network.to_string(), "NETWORK_VALIDATION");
        assert_eq!(StrategyType::from_str("PAYLOAD_VALIDATION").unwrap(), StrategyType::Payload);
        assert_eq!(Operation::NotExist.to_string(), "NOT_EXIST");
        assert_eq!(Operation::from_str("HAS_ALL").unwrap(), Operation::HasAll);
    }
}
