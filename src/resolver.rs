//! Local evaluation of a switch against a snapshot.

use crate::model::{EvaluationRequest, EvaluationResult, Snapshot};
use crate::regex_guard::RegexGuard;
use crate::strategies::process_operation;
use crate::{Error, Result};

const LOG_TARGET: &str = "  resolver";

/// Walk the snapshot tree for `request.key()` and decide the switch.
///
/// Checks run in a fixed order and the first failing one determines the
/// reason: domain, group, config, relay, then each activated strategy in
/// declaration order.
///
/// # Errors
///
/// Returns [`Error::UnknownKey`] if no group holds the key.
pub fn resolve(snapshot: &Snapshot, request: &EvaluationRequest, restrict_relay: bool, guard: &RegexGuard) -> Result<EvaluationResult> {
    let domain = snapshot.domain();
    if !domain.activated {
        return Ok(EvaluationResult::disabled("Domain disabled"));
    }

    let Some((group, config)) = domain.find_config(request.key()) else {
        return Err(Error::UnknownKey(request.key().to_string()));
    };

    if !group.activated {
        return Ok(EvaluationResult::disabled("Group disabled"));
    }

    if !config.activated {
        return Ok(EvaluationResult::disabled("Config disabled"));
    }

    if config.relay_enabled() && restrict_relay {
        return Ok(EvaluationResult::disabled("Config has Relay enabled"));
    }

    for strategy in config.strategies.iter().filter(|s| s.activated) {
        let Some(entry) = request.entry_for(strategy.strategy) else {
            return Ok(EvaluationResult::disabled(format!("Strategy '{}' did not receive any input", strategy.strategy)));
        };

        if !process_operation(strategy, &entry.input, guard) {
            log::debug!(target: LOG_TARGET, "Strategy {} rejected input for '{}'", strategy.strategy, request.key());
            return Ok(EvaluationResult::disabled(format!("Strategy '{}' does not agree", strategy.strategy)));
        }
    }

    Ok(EvaluationResult::enabled("Success"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StrategyType;

    const DOCUMENT: &str = r#"{
        "data": { "domain": {
            "name": "Business", "version": 3, "activated": true,
            "group": [
                { "name": "Main", "activated": true, "config": [
                    { "key": "PLAIN", "activated": true },
                    { "key": "OFF", "activated": false,
                      "strategies": [{ "strategy": "VALUE_VALIDATION", "operation": "EXIST", "values": ["a"], "activated": true }] },
                    { "key": "RELAYED", "activated": true, "relay": { "type": "VALIDATION", "activated": true } },
                    { "key": "GUARDED", "activated": true, "strategies": [
                        { "strategy": "VALUE_VALIDATION", "operation": "EXIST", "values": ["USER_1"], "activated": true },
                        { "strategy": "NETWORK_VALIDATION", "operation": "EXIST", "values": ["10.0.0.0/30"], "activated": true },
                        { "strategy": "REGEX_VALIDATION", "operation": "EXIST", "values": ["never"], "activated": false }
                    ] }
                ] },
                { "name": "Parked", "activated": false, "config": [{ "key": "PARKED", "activated": true }] }
            ]
        } }
    }"#;

    fn snapshot() -> Snapshot {
        Snapshot::from_json(DOCUMENT).unwrap()
    }

    fn run(request: &EvaluationRequest) -> Result<EvaluationResult> {
        resolve(&snapshot(), request, true, &RegexGuard::direct())
    }

    fn reason(result: &EvaluationResult) -> &str {
        result.reason.as_deref().unwrap()
    }

    #[test]
    fn domain_disabled() {
        let text = DOCUMENT.replacen(r#""activated": true,"#, r#""activated": false,"#, 1);
        let snapshot = Snapshot::from_json(&text).unwrap();
        let result = resolve(&snapshot, &EvaluationRequest::new("PLAIN"), true, &RegexGuard::direct()).unwrap();
        assert!(!result.result);
        assert_eq!(reason(&result), "Domain disabled");
    }

    #[test]
    fn unknown_key_is_error() {
        let err = run(&EvaluationRequest::new("MISSING")).unwrap_err();
        assert_eq!(err.to_string(), "Unable to load a key MISSING");
    }

    #[test]
    fn group_and_config_disabled() {
        let result = run(&EvaluationRequest::new("PARKED")).unwrap();
        assert_eq!(reason(&result), "Group disabled");

        let result = run(&EvaluationRequest::new("OFF").with(StrategyType::Value, "a")).unwrap();
        assert!(!result.result);
        assert_eq!(reason(&result), "Config disabled");
    }

    #[test]
    fn relay_respects_restriction() {
        let request = EvaluationRequest::new("RELAYED");
        let result = run(&request).unwrap();
        assert_eq!(reason(&result), "Config has Relay enabled");

        let result = resolve(&snapshot(), &request, false, &RegexGuard::direct()).unwrap();
        assert!(result.result);
    }

    #[test]
    fn no_strategies_is_success() {
        let result = run(&EvaluationRequest::new("PLAIN")).unwrap();
        assert!(result.result);
        assert_eq!(reason(&result), "Success");
    }

    #[test]
    fn strategies_short_circuit_in_order() {
        let missing = run(&EvaluationRequest::new("GUARDED")).unwrap();
        assert_eq!(reason(&missing), "Strategy 'VALUE_VALIDATION' did not receive any input");

        let rejected = run(&EvaluationRequest::new("GUARDED").with(StrategyType::Value, "USER_2")).unwrap();
        assert_eq!(reason(&rejected), "Strategy 'VALUE_VALIDATION' does not agree");

        let network_missing = run(&EvaluationRequest::new("GUARDED").with(StrategyType::Value, "USER_1")).unwrap();
        assert_eq!(reason(&network_missing), "Strategy 'NETWORK_VALIDATION' did not receive any input");

        let network_rejected = run(&EvaluationRequest::new("GUARDED")
            .with(StrategyType::Value, "USER_1")
            .with(StrategyType::Network, "10.0.0.4"))
        .unwrap();
        assert_eq!(reason(&network_rejected), "Strategy 'NETWORK_VALIDATION' does not agree");
    }

    #[test]
    fn all_agree_is_success_and_inactive_strategies_are_skipped() {
        let request = EvaluationRequest::new("GUARDED")
            .with(StrategyType::Value, "USER_1")
            .with(StrategyType::Network, "10.0.0.3");
        let result = run(&request).unwrap();
        assert!(result.result);
        assert_eq!(reason(&result), "Success");
    }

    #[test]
    fn first_entry_per_type_is_used() {
        let request = EvaluationRequest::new("GUARDED")
            .with(StrategyType::Value, "USER_2")
            .with(StrategyType::Value, "USER_1")
            .with(StrategyType::Network, "10.0.0.3");
        let result = run(&request).unwrap();
        assert!(!result.result);
    }
}
