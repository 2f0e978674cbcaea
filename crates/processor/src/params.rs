//! Typed access to free-form component parameters
//!
//! Every constructor in the operator, source and sink registries reads its
//! configuration through [`ParamReader`], so a missing or mistyped field always
//! surfaces as a descriptive [`BuildError`] naming the component and parameter.

use crate::duration::parse_duration;
use crate::error::{BuildError, BuildResult};
use chrono::Duration;
use dataflow_types::Params;
use serde_json::Value;

/// Reads parameters on behalf of a named component
#[derive(Debug, Clone, Copy)]
pub struct ParamReader<'a> {
    component: &'a str,
    params: &'a Params,
}

impl<'a> ParamReader<'a> {
    pub fn new(component: &'a str, params: &'a Params) -> Self {
        Self { component, params }
    }

    /// Name of the component being configured
    pub fn component(&self) -> &'a str {
        self.component
    }

    fn missing(&self, param: &str) -> BuildError {
        BuildError::MissingParam {
            component: self.component.to_string(),
            param: param.to_string(),
        }
    }

    fn invalid(&self, param: &str, reason: impl Into<String>) -> BuildError {
        BuildError::InvalidParam {
            component: self.component.to_string(),
            param: param.to_string(),
            reason: reason.into(),
        }
    }

    /// Any value; `null` counts as present
    pub fn value(&self, param: &str) -> BuildResult<&'a Value> {
        self.params.get(param).ok_or_else(|| self.missing(param))
    }

    /// A required string
    pub fn string(&self, param: &str) -> BuildResult<&'a str> {
        match self.params.get(param) {
            None | Some(Value::Null) => Err(self.missing(param)),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(self.invalid(param, format!("expected a string, got {}", other))),
        }
    }

    /// An optional string
    pub fn optional_string(&self, param: &str) -> BuildResult<Option<&'a str>> {
        match self.params.get(param) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.string(param).map(Some),
        }
    }

    /// A required integer of at least one
    ///
    /// Integral floats are accepted, since JSON producers frequently emit `2.0`.
    pub fn positive_usize(&self, param: &str) -> BuildResult<usize> {
        let value = match self.params.get(param) {
            None | Some(Value::Null) => return Err(self.missing(param)),
            Some(v) => v,
        };

        let number = if let Some(n) = value.as_u64() {
            n
        } else if let Some(f) = value.as_f64() {
            if f.fract() != 0.0 || f < 0.0 || f > u64::MAX as f64 {
                return Err(self.invalid(param, format!("expected a whole number, got {}", f)));
            }
            f as u64
        } else {
            return Err(self.invalid(param, format!("expected an integer, got {}", value)));
        };

        if number == 0 {
            return Err(self.invalid(param, "must be at least 1"));
        }
        usize::try_from(number).map_err(|_| self.invalid(param, "too large"))
    }

    /// A required duration string
    pub fn duration(&self, param: &str) -> BuildResult<Duration> {
        let raw = self.string(param)?;
        parse_duration(raw).map_err(|source| BuildError::InvalidDuration {
            component: self.component.to_string(),
            param: param.to_string(),
            source,
        })
    }

    /// A required, strictly positive duration string
    pub fn positive_duration(&self, param: &str) -> BuildResult<Duration> {
        let duration = self.duration(param)?;
        if duration <= Duration::zero() {
            return Err(self.invalid(param, "must be greater than zero"));
        }
        Ok(duration)
    }

    /// A required, non-negative duration string
    pub fn non_negative_duration(&self, param: &str) -> BuildResult<Duration> {
        let duration = self.duration(param)?;
        if duration < Duration::zero() {
            return Err(self.invalid(param, "must not be negative"));
        }
        Ok(duration)
    }

    /// A required JSON object
    pub fn object(&self, param: &str) -> BuildResult<&'a Params> {
        match self.params.get(param) {
            None | Some(Value::Null) => Err(self.missing(param)),
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(self.invalid(param, format!("expected an object, got {}", other))),
        }
    }

    /// A required JSON array
    pub fn array(&self, param: &str) -> BuildResult<&'a Vec<Value>> {
        match self.params.get(param) {
            None | Some(Value::Null) => Err(self.missing(param)),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(self.invalid(param, format!("expected an array, got {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_string_params() {
        let p = params(json!({"col": "status", "n": 3}));
        let reader = ParamReader::new("map", &p);

        assert_eq!(reader.string("col").unwrap(), "status");
        assert!(matches!(
            reader.string("missing"),
            Err(BuildError::MissingParam { .. })
        ));
        assert!(matches!(
            reader.string("n"),
            Err(BuildError::InvalidParam { .. })
        ));
        assert_eq!(reader.optional_string("missing").unwrap(), None);
    }

    #[test]
    fn test_positive_usize() {
        let p = params(json!({"a": 3, "b": 2.0, "c": 2.5, "d": 0, "e": -1, "f": "3"}));
        let reader = ParamReader::new("sliding_window", &p);

        assert_eq!(reader.positive_usize("a").unwrap(), 3);
        assert_eq!(reader.positive_usize("b").unwrap(), 2);
        for bad in ["c", "d", "e", "f"] {
            assert!(
                matches!(reader.positive_usize(bad), Err(BuildError::InvalidParam { .. })),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_duration_params() {
        let p = params(json!({"ok": "1m", "bad": "not-a-duration", "zero": "0", "neg": "-1s"}));
        let reader = ParamReader::new("time_window", &p);

        assert_eq!(reader.positive_duration("ok").unwrap(), Duration::minutes(1));
        assert!(matches!(
            reader.duration("bad"),
            Err(BuildError::InvalidDuration { .. })
        ));
        assert!(reader.positive_duration("zero").is_err());
        assert_eq!(reader.non_negative_duration("zero").unwrap(), Duration::zero());
        assert!(reader.non_negative_duration("neg").is_err());
    }

    #[test]
    fn test_object_param() {
        let p = params(json!({"inner": {"type": "reduce"}, "flat": 1}));
        let reader = ParamReader::new("time_window", &p);

        assert!(reader.object("inner").is_ok());
        assert!(reader.object("flat").is_err());
        assert!(matches!(
            reader.object("absent"),
            Err(BuildError::MissingParam { .. })
        ));
    }
}
