//! Typed operations and their `{fn, args}` wire form.
//!
//! A registry is a closed enum deriving serde with
//! `#[serde(tag = "fn", content = "args")]`, so each variant serialises to the
//! operation name plus its payload. Unit variants take no arguments.

use crate::domain::WorkerFailure;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// A closed registry of operations the background worker accepts.
pub trait Operation: Serialize + DeserializeOwned + Send + 'static {
    /// Wire names of every operation in the registry.
    const NAMES: &'static [&'static str];

    fn name(&self) -> &'static str;
}

/// Split an operation into its wire name and argument payload.
pub fn call_parts<Op: Operation>(op: &Op) -> Result<(String, Value), serde_json::Error> {
    let value = serde_json::to_value(op)?;
    let mut object = match value {
        Value::Object(object) => object,
        _ => {
            return Err(serde::ser::Error::custom(
                "operation must serialise as an object",
            ))
        }
    };
    let args = object.remove("args").unwrap_or(Value::Null);
    Ok((op.name().to_string(), args))
}

/// Rebuild a typed operation from a wire name and arguments.
///
/// Names outside the registry fail as `UnknownOperation`; payloads that do
/// not match the operation fail as `InvalidArguments`.
pub fn decode_call<Op: Operation>(function: &str, args: Value) -> Result<Op, WorkerFailure> {
    if !Op::NAMES.contains(&function) {
        return Err(WorkerFailure::unknown_operation(function));
    }

    let mut tagged = Map::new();
    tagged.insert("fn".to_string(), Value::String(function.to_string()));
    if !is_empty_args(&args) {
        tagged.insert("args".to_string(), args);
    }

    serde_json::from_value(Value::Object(tagged)).map_err(|e| {
        WorkerFailure::invalid_arguments(format!("Invalid arguments for {}: {}", function, e))
    })
}

fn is_empty_args(args: &Value) -> bool {
    match args {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
pub(crate) mod test_ops {
    use super::Operation;
    use serde::{Deserialize, Serialize};

    /// Small registry used by the router tests.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "fn", content = "args", rename_all = "camelCase")]
    pub enum TestOp {
        #[serde(rename_all = "camelCase")]
        GetBalance { address58: String },
        #[serde(rename_all = "camelCase")]
        FetchAccount { public_key58: String },
        LoadContract,
        #[serde(rename_all = "camelCase")]
        DeployToken { fee_payer_key58: String },
        #[serde(rename_all = "camelCase")]
        Sleep { millis: u64 },
    }

    impl Operation for TestOp {
        const NAMES: &'static [&'static str] = &[
            "getBalance",
            "fetchAccount",
            "loadContract",
            "deployToken",
            "sleep",
        ];

        fn name(&self) -> &'static str {
            match self {
                TestOp::GetBalance { .. } => "getBalance",
                TestOp::FetchAccount { .. } => "fetchAccount",
                TestOp::LoadContract => "loadContract",
                TestOp::DeployToken { .. } => "deployToken",
                TestOp::Sleep { .. } => "sleep",
            }
        }
    }
}
