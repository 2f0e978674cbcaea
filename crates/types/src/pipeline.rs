//! Declarative pipeline specifications
//!
//! A pipeline is described as a source, an ordered list of operators and a
//! sink. Operator parameters are free-form and interpreted by the operator
//! registry; window operators nest a further operator specification under
//! their `inner` parameter.
//!
//! ```json
//! {
//!   "source": { "type": "file", "path": "input.csv" },
//!   "operators": [
//!     { "type": "tumbling_window",
//!       "params": { "size": 2, "inner": { "type": "reduce", "params": { "key": "value", "agg": "count" } } } }
//!   ],
//!   "sink": { "type": "file", "path": "output.csv" }
//! }
//! ```

use crate::errors::{Result, SpecError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form parameter mapping
pub type Params = Map<String, Value>;

/// Complete description of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Optional human-readable job name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Where events come from
    pub source: SourceSpec,

    /// Operators applied in order
    #[serde(default)]
    pub operators: Vec<OperatorSpec>,

    /// Where results go
    pub sink: SinkSpec,
}

impl PipelineSpec {
    /// Parse a specification from a JSON document
    pub fn from_json(input: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(input)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a specification from an already decoded JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let spec: Self = serde_json::from_value(value)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Check the top-level structure
    pub fn validate(&self) -> Result<()> {
        if self.source.kind.is_empty() {
            return Err(SpecError::MissingType {
                section: "source".to_string(),
            });
        }
        if self.sink.kind.is_empty() {
            return Err(SpecError::MissingType {
                section: "sink".to_string(),
            });
        }
        for (idx, op) in self.operators.iter().enumerate() {
            if op.kind.is_empty() {
                return Err(SpecError::MissingType {
                    section: format!("operators[{}]", idx),
                });
            }
        }
        Ok(())
    }
}

/// Operator descriptor: a type tag plus per-type parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSpec {
    /// Registered operator type
    #[serde(rename = "type")]
    pub kind: String,

    /// Parameters interpreted by the operator constructor
    #[serde(default)]
    pub params: Params,
}

impl OperatorSpec {
    /// Create a new operator descriptor
    pub fn new(kind: impl Into<String>, params: Params) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }

    /// Create a descriptor from a `serde_json::json!` object
    ///
    /// Non-object values produce an empty parameter map.
    pub fn from_json(kind: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Params::new(),
        };
        Self::new(kind, params)
    }
}

/// Source descriptor; parameters sit beside the type tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub params: Params,
}

/// Sink descriptor; parameters sit beside the type tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub params: Params,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_nested_spec() {
        let spec = PipelineSpec::from_json(
            r#"{
                "source": {"type": "file", "path": "in.csv"},
                "operators": [
                    {"type": "tumbling_window", "params": {
                        "size": 2,
                        "inner": {"type": "reduce", "params": {"key": "value", "agg": "count"}}
                    }}
                ],
                "sink": {"type": "file", "path": "out.csv"}
            }"#,
        )
        .unwrap();

        assert_eq!(spec.source.kind, "file");
        assert_eq!(spec.source.params.get("path"), Some(&json!("in.csv")));
        assert_eq!(spec.operators.len(), 1);
        assert_eq!(spec.operators[0].kind, "tumbling_window");
        assert_eq!(spec.operators[0].params["inner"]["type"], json!("reduce"));
        assert_eq!(spec.sink.kind, "file");
    }

    #[test]
    fn test_missing_sink_rejected() {
        let err = PipelineSpec::from_json(r#"{"source": {"type": "file"}, "operators": []}"#)
            .unwrap_err();
        assert!(matches!(err, SpecError::Malformed(_)));
        assert!(err.to_string().contains("sink"));
    }

    #[test]
    fn test_missing_source_rejected() {
        let err = PipelineSpec::from_value(json!({"sink": {"type": "collect"}})).unwrap_err();
        assert!(err.to_string().contains("source"));
    }

    #[test]
    fn test_empty_type_rejected() {
        let err = PipelineSpec::from_value(json!({
            "source": {"type": ""},
            "sink": {"type": "collect"}
        }))
        .unwrap_err();
        assert!(matches!(err, SpecError::MissingType { .. }));
    }

    #[test]
    fn test_operators_default_empty() {
        let spec = PipelineSpec::from_value(json!({
            "source": {"type": "memory", "records": []},
            "sink": {"type": "collect"}
        }))
        .unwrap();
        assert!(spec.operators.is_empty());
    }
}
