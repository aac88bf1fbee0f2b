//! # Contract Spec
//!
//! Methods and events of a registry contract, loaded from human-readable
//! signatures or from a compiled artifact (`{"contractName": .., "abi": [..]}`).

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::abi::{param_type, Event, EventParam, Function};
use crate::error::Err;
use crate::tracerr;

/// Methods and events of a contract.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContractSpec {
    /// Contract name.
    pub name: String,

    functions: HashMap<String, Function>,
    events: HashMap<String, Event>,
}

impl ContractSpec {
    /// Build a spec from human-readable signatures such as
    /// `function changed(address) returns (uint256)` or
    /// `event DIDOwnerChanged(address indexed identity, address owner, uint256 previousChange)`.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if a signature cannot be parsed.
    pub fn from_signatures(name: impl Into<String>, signatures: &[&str]) -> crate::Result<Self> {
        let mut spec = Self {
            name: name.into(),
            ..Self::default()
        };
        for signature in signatures {
            if signature.trim_start().starts_with("event ") {
                let event: Event = signature.parse()?;
                spec.events.insert(event.name.clone(), event);
            } else {
                let function: Function = signature.parse()?;
                spec.functions.insert(function.name.clone(), function);
            }
        }
        Ok(spec)
    }

    /// Parse a compiled contract artifact.
    ///
    /// Entries using types outside the supported set (tuples, signed
    /// integers) are skipped.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the artifact is not valid JSON of
    /// the expected shape.
    pub fn from_artifact(json: &str) -> crate::Result<Self> {
        let artifact: Artifact = match serde_json::from_str(json) {
            Ok(artifact) => artifact,
            Err(e) => tracerr!(Err::InvalidStructure, "invalid contract artifact: {e}"),
        };

        let mut spec = Self {
            name: artifact.contract_name,
            ..Self::default()
        };
        for entry in artifact.abi {
            match entry.kind.as_str() {
                "function" => match entry.function() {
                    Ok(function) => {
                        spec.functions.insert(function.name.clone(), function);
                    }
                    Err(e) => tracing::warn!("skipping function {}: {e}", entry.name),
                },
                "event" => match entry.event() {
                    Ok(event) => {
                        spec.events.insert(event.name.clone(), event);
                    }
                    Err(e) => tracing::warn!("skipping event {}: {e}", entry.name),
                },
                _ => {}
            }
        }
        Ok(spec)
    }

    /// Read and parse a compiled contract artifact from disk.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => tracerr!(Err::InvalidStructure, "unable to read {}: {e}", path.display()),
        };
        Self::from_artifact(&json)
    }

    /// Look up a method by name.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the contract has no such method.
    pub fn function(&self, name: &str) -> crate::Result<&Function> {
        let Some(function) = self.functions.get(name) else {
            tracerr!(Err::InternalError, "{} has no method {name}", self.name);
        };
        Ok(function)
    }

    /// Look up an event by name.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the contract has no such event.
    pub fn event(&self, name: &str) -> crate::Result<&Event> {
        let Some(event) = self.events.get(name) else {
            tracerr!(Err::InternalError, "{} has no event {name}", self.name);
        };
        Ok(event)
    }

    /// Find the method called by `data`, matching on its selector.
    #[must_use]
    pub fn function_by_selector(&self, data: &[u8]) -> Option<&Function> {
        let selector = data.get(..4)?;
        self.functions.values().find(|f| f.selector() == selector)
    }

    /// Find the event whose signature hash is `topic`.
    #[must_use]
    pub fn event_by_topic(&self, topic: &[u8; 32]) -> Option<&Event> {
        self.events.values().find(|e| &e.topic() == topic)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
    contract_name: String,
    abi: Vec<AbiEntry>,
}

#[derive(Deserialize)]
struct AbiEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
}

#[derive(Deserialize)]
struct AbiParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    indexed: bool,
}

impl AbiEntry {
    fn function(&self) -> crate::Result<Function> {
        Ok(Function {
            name: self.name.clone(),
            inputs: self.inputs.iter().map(|p| param_type(&p.kind)).collect::<crate::Result<_>>()?,
            outputs: self.outputs.iter().map(|p| param_type(&p.kind)).collect::<crate::Result<_>>()?,
        })
    }

    fn event(&self) -> crate::Result<Event> {
        let inputs = self
            .inputs
            .iter()
            .map(|p| {
                Ok(EventParam {
                    name: p.name.clone(),
                    kind: param_type(&p.kind)?,
                    indexed: p.indexed,
                })
            })
            .collect::<crate::Result<_>>()?;
        Ok(Event {
            name: self.name.clone(),
            inputs,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ARTIFACT: &str = r#"{
        "contractName": "ValidatorControl",
        "abi": [
            {"type": "constructor", "inputs": []},
            {
                "type": "function", "name": "addValidator", "stateMutability": "nonpayable",
                "inputs": [{"name": "newValidator", "type": "address", "internalType": "address"}],
                "outputs": []
            },
            {
                "type": "function", "name": "getValidators", "stateMutability": "view",
                "inputs": [],
                "outputs": [{"name": "", "type": "address[]", "internalType": "address[]"}]
            },
            {
                "type": "function", "name": "validatorInfos", "stateMutability": "view",
                "inputs": [{"name": "", "type": "tuple", "components": []}],
                "outputs": []
            },
            {
                "type": "event", "name": "ValidatorAdded", "anonymous": false,
                "inputs": [
                    {"name": "validator", "type": "address", "indexed": false},
                    {"name": "byAccount", "type": "address", "indexed": true}
                ]
            }
        ]
    }"#;

    #[test]
    fn artifact() {
        let spec = ContractSpec::from_artifact(ARTIFACT).expect("should parse");
        assert_eq!(spec.name, "ValidatorControl");
        assert_eq!(spec.function("addValidator").expect("should exist").selector(), [0x4d, 0x23, 0x8c, 0x8e]);
        assert_eq!(
            spec.function("getValidators").expect("should exist").signature(),
            "getValidators()"
        );

        // tuple-typed entries are skipped
        let err = spec.function("validatorInfos").expect_err("should be skipped");
        assert!(err.is(Err::InternalError));

        let call = [0x4d, 0x23, 0x8c, 0x8e, 0x00];
        assert_eq!(spec.function_by_selector(&call).map(|f| f.name.as_str()), Some("addValidator"));
        assert!(spec.function_by_selector(&call[..3]).is_none());

        let event = spec.event("ValidatorAdded").expect("should exist");
        assert!(event.inputs[1].indexed);
        assert_eq!(spec.event_by_topic(&event.topic()).map(|e| e.name.as_str()), Some("ValidatorAdded"));
    }

    #[test]
    fn invalid_artifact() {
        let err = ContractSpec::from_artifact("{\"abi\": []}").expect_err("should fail");
        assert!(err.is(Err::InvalidStructure));
    }
}
