//! Operator registry: turns operator specifications into running operators
//!
//! The registry maps a type tag to a constructor. Window constructors read a
//! nested `inner` specification and build it recursively through the same
//! registry, so any batch-capable operator can sit inside any window. Nesting
//! is limited to [`MAX_NESTING_DEPTH`] levels.
//!
//! ```rust
//! use dataflow_types::OperatorSpec;
//! use processor::pipeline::OperatorRegistry;
//! use serde_json::json;
//!
//! let spec = OperatorSpec::from_json(
//!     "tumbling_window",
//!     json!({"size": 2, "inner": {"type": "reduce", "params": {"key": "k", "agg": "count"}}}),
//! );
//! let op = OperatorRegistry::global().build(&spec).unwrap();
//! assert_eq!(op.name(), "tumbling_window");
//! ```

use crate::aggregation::{AggregateKind, ReduceOperator};
use crate::error::{BuildError, BuildResult};
use crate::params::ParamReader;
use crate::pipeline::operator::{FilterOperator, MapOperator, StreamOperator};
use crate::window::{
    CountSlidingWindow, CountTumblingWindow, TimeSlidingWindow, TimeTumblingWindow,
    WatermarkWindow,
};
use dataflow_types::{OperatorSpec, Params};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::trace;

/// Deepest allowed chain of windows nested through `inner`
pub const MAX_NESTING_DEPTH: usize = 8;

/// Constructor registered for a type tag
pub type OperatorFactory =
    fn(&ParamReader<'_>, &BuildContext<'_>) -> BuildResult<Box<dyn StreamOperator>>;

/// Global registry instance
static GLOBAL_REGISTRY: OnceLock<Arc<OperatorRegistry>> = OnceLock::new();

/// Type tag to constructor mapping
#[derive(Clone)]
pub struct OperatorRegistry {
    factories: HashMap<String, OperatorFactory>,
    max_depth: usize,
}

/// State threaded through a recursive build
pub struct BuildContext<'a> {
    registry: &'a OperatorRegistry,
    depth: usize,
}

impl<'a> BuildContext<'a> {
    /// Nesting level of the operator being built, 0 at the top of the chain
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Builds the `inner` specification of a window
    ///
    /// The inner specification is an object `{"type": ..., "params": {...}}`;
    /// `params` may be omitted. Failures inside the inner build are wrapped in
    /// [`BuildError::Inner`] naming the enclosing window.
    pub fn build_inner(&self, window: &ParamReader<'_>) -> BuildResult<Box<dyn StreamOperator>> {
        let inner = window.object("inner")?;
        let label = format!("{} inner", window.component());
        let reader = ParamReader::new(&label, inner);

        let kind = reader.string("type")?;
        let empty = Params::new();
        let params = match inner.get("params") {
            None | Some(Value::Null) => &empty,
            Some(_) => reader.object("params")?,
        };

        self.registry
            .build_at(kind, params, self.depth + 1)
            .map_err(|source| BuildError::Inner {
                window: window.component().to_string(),
                source: Box::new(source),
            })
    }
}

impl OperatorRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    /// A registry with every built-in operator
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("map", build_map);
        registry.register("filter", build_filter);
        registry.register("reduce", build_reduce);
        registry.register("tumbling_window", build_count_tumbling);
        registry.register("count_tumbling", build_count_tumbling);
        registry.register("sliding_window", build_count_sliding);
        registry.register("count_sliding", build_count_sliding);
        registry.register("time_window", build_time_tumbling);
        registry.register("time_sliding_window", build_time_sliding);
        registry.register("time_window_watermark", build_watermark_window);
        registry
    }

    /// Get or initialize the process-wide registry of built-in operators
    pub fn global() -> Arc<OperatorRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(OperatorRegistry::with_builtins()))
            .clone()
    }

    /// Registers (or replaces) the constructor for `kind`
    pub fn register(&mut self, kind: impl Into<String>, factory: OperatorFactory) {
        self.factories.insert(kind.into(), factory);
    }

    /// Overrides the nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered type tags, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Builds one operator from its specification
    pub fn build(&self, spec: &OperatorSpec) -> BuildResult<Box<dyn StreamOperator>> {
        self.build_at(&spec.kind, &spec.params, 0)
    }

    /// Builds an operator chain, stopping at the first failure
    pub fn build_all(&self, specs: &[OperatorSpec]) -> BuildResult<Vec<Box<dyn StreamOperator>>> {
        specs.iter().map(|spec| self.build(spec)).collect()
    }

    fn build_at(
        &self,
        kind: &str,
        params: &Params,
        depth: usize,
    ) -> BuildResult<Box<dyn StreamOperator>> {
        if depth > self.max_depth {
            return Err(BuildError::NestingTooDeep {
                max: self.max_depth,
            });
        }

        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| BuildError::UnknownOperator(kind.to_string()))?;

        trace!(operator = kind, depth = depth, "building operator");
        let reader = ParamReader::new(kind, params);
        let ctx = BuildContext {
            registry: self,
            depth,
        };
        factory(&reader, &ctx)
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("types", &self.types())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

fn build_map(params: &ParamReader<'_>, _ctx: &BuildContext<'_>) -> BuildResult<Box<dyn StreamOperator>> {
    let column = params.string("col")?;
    let value = params.value("val")?.clone();
    let mut op = MapOperator::set_field(column, value);
    if let Some(name) = params.optional_string("name")? {
        op = op.with_name(name);
    }
    Ok(Box::new(op))
}

fn build_filter(params: &ParamReader<'_>, _ctx: &BuildContext<'_>) -> BuildResult<Box<dyn StreamOperator>> {
    let field = params.string("field")?;
    let expected = params.value("eq")?.clone();
    let mut op = FilterOperator::field_equals(field, expected);
    if let Some(name) = params.optional_string("name")? {
        op = op.with_name(name);
    }
    Ok(Box::new(op))
}

fn build_reduce(params: &ParamReader<'_>, _ctx: &BuildContext<'_>) -> BuildResult<Box<dyn StreamOperator>> {
    let key = params.string("key")?;
    let agg = params.string("agg")?;
    let kind = AggregateKind::parse(agg).ok_or_else(|| BuildError::InvalidParam {
        component: params.component().to_string(),
        param: "agg".to_string(),
        reason: format!("unsupported aggregate '{}', expected count, sum, avg, min or max", agg),
    })?;
    let field = params.optional_string("field")?.map(str::to_string);

    let mut op = ReduceOperator::new(key, kind, field)?;
    if let Some(name) = params.optional_string("name")? {
        op = op.with_name(name);
    }
    Ok(Box::new(op))
}

fn build_count_tumbling(
    params: &ParamReader<'_>,
    ctx: &BuildContext<'_>,
) -> BuildResult<Box<dyn StreamOperator>> {
    let size = params.positive_usize("size")?;
    let inner = ctx.build_inner(params)?;
    let op = CountTumblingWindow::new(size, inner)?
        .with_name(params.optional_string("name")?.unwrap_or("tumbling_window"));
    Ok(Box::new(op))
}

fn build_count_sliding(
    params: &ParamReader<'_>,
    ctx: &BuildContext<'_>,
) -> BuildResult<Box<dyn StreamOperator>> {
    let size = params.positive_usize("size")?;
    let step = params.positive_usize("step")?;
    let inner = ctx.build_inner(params)?;
    let op = CountSlidingWindow::new(size, step, inner)?
        .with_name(params.optional_string("name")?.unwrap_or("sliding_window"));
    Ok(Box::new(op))
}

fn build_time_tumbling(
    params: &ParamReader<'_>,
    ctx: &BuildContext<'_>,
) -> BuildResult<Box<dyn StreamOperator>> {
    let duration = params.positive_duration("duration")?;
    let inner = ctx.build_inner(params)?;
    let op = TimeTumblingWindow::new(duration, inner)?
        .with_name(params.optional_string("name")?.unwrap_or("time_window"));
    Ok(Box::new(op))
}

fn build_time_sliding(
    params: &ParamReader<'_>,
    ctx: &BuildContext<'_>,
) -> BuildResult<Box<dyn StreamOperator>> {
    let size = params.positive_duration("size")?;
    let slide = params.positive_duration("slide")?;
    let inner = ctx.build_inner(params)?;
    let op = TimeSlidingWindow::new(size, slide, inner)?
        .with_name(params.optional_string("name")?.unwrap_or("time_sliding_window"));
    Ok(Box::new(op))
}

fn build_watermark_window(
    params: &ParamReader<'_>,
    ctx: &BuildContext<'_>,
) -> BuildResult<Box<dyn StreamOperator>> {
    let duration = params.positive_duration("duration")?;
    let allowed_lateness = params.non_negative_duration("allowed_lateness")?;
    let inner = ctx.build_inner(params)?;
    let op = WatermarkWindow::new(duration, allowed_lateness, inner)?
        .with_name(params.optional_string("name")?.unwrap_or("time_window_watermark"));
    Ok(Box::new(op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dataflow_types::Event;
    use serde_json::json;

    fn spec(kind: &str, params: Value) -> OperatorSpec {
        OperatorSpec::from_json(kind, params)
    }

    fn reduce_inner() -> Value {
        json!({"type": "reduce", "params": {"key": "k", "agg": "count"}})
    }

    #[test]
    fn test_builtin_types() {
        let registry = OperatorRegistry::with_builtins();
        for kind in [
            "map",
            "filter",
            "reduce",
            "tumbling_window",
            "count_tumbling",
            "sliding_window",
            "count_sliding",
            "time_window",
            "time_sliding_window",
            "time_window_watermark",
        ] {
            assert!(registry.contains(kind), "{} missing", kind);
        }
        assert_eq!(registry.types().len(), 10);
    }

    #[test]
    fn test_build_every_window_kind() {
        let registry = OperatorRegistry::global();
        let cases = [
            ("tumbling_window", json!({"size": 2, "inner": reduce_inner()})),
            ("sliding_window", json!({"size": 3, "step": 1, "inner": reduce_inner()})),
            ("time_window", json!({"duration": "1m", "inner": reduce_inner()})),
            (
                "time_sliding_window",
                json!({"size": "10s", "slide": "5s", "inner": reduce_inner()}),
            ),
            (
                "time_window_watermark",
                json!({"duration": "1m", "allowed_lateness": "0s", "inner": reduce_inner()}),
            ),
        ];
        for (kind, params) in cases {
            let op = registry.build(&spec(kind, params)).unwrap();
            assert_eq!(op.name(), kind);
        }
    }

    #[test]
    fn test_unknown_operator() {
        let err = OperatorRegistry::global()
            .build(&spec("explode", json!({})))
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownOperator(ref t) if t == "explode"));
    }

    #[test]
    fn test_missing_and_mistyped_params() {
        let registry = OperatorRegistry::global();
        assert!(matches!(
            registry.build(&spec("map", json!({"col": "x"}))).unwrap_err(),
            BuildError::MissingParam { ref param, .. } if param == "val"
        ));
        assert!(matches!(
            registry.build(&spec("filter", json!({"field": 3, "eq": 1}))).unwrap_err(),
            BuildError::InvalidParam { ref param, .. } if param == "field"
        ));
        assert!(matches!(
            registry.build(&spec("reduce", json!({"key": "k", "agg": "median"}))).unwrap_err(),
            BuildError::InvalidParam { ref param, .. } if param == "agg"
        ));
        assert!(matches!(
            registry.build(&spec("tumbling_window", json!({"size": 2}))).unwrap_err(),
            BuildError::MissingParam { ref param, .. } if param == "inner"
        ));
    }

    #[test]
    fn test_invalid_duration() {
        let err = OperatorRegistry::global()
            .build(&spec(
                "time_window",
                json!({"duration": "not-a-duration", "inner": reduce_inner()}),
            ))
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidDuration { .. }));
        assert!(err.to_string().contains("not-a-duration"));
    }

    #[test]
    fn test_inner_errors_are_wrapped() {
        let err = OperatorRegistry::global()
            .build(&spec(
                "time_window",
                json!({"duration": "1m", "inner": {"type": "nope", "params": {}}}),
            ))
            .unwrap_err();
        assert_eq!(err.to_string(), "time_window inner op error: unknown operator type: nope");
        assert!(matches!(err.root_cause(), BuildError::UnknownOperator(_)));
    }

    #[test]
    fn test_inner_without_batch_capability() {
        let err = OperatorRegistry::global()
            .build(&spec(
                "tumbling_window",
                json!({"size": 2, "inner": {"type": "map", "params": {"col": "a", "val": 1}}}),
            ))
            .unwrap_err();
        assert!(matches!(err, BuildError::NotBatchCapable { .. }));
    }

    #[test]
    fn test_inner_params_may_be_omitted() {
        let err = OperatorRegistry::global()
            .build(&spec(
                "tumbling_window",
                json!({"size": 2, "inner": {"type": "reduce"}}),
            ))
            .unwrap_err();
        // reduce itself still needs its key
        assert!(matches!(
            err.root_cause(),
            BuildError::MissingParam { ref param, .. } if param == "key"
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let registry = OperatorRegistry::with_builtins().with_max_depth(2);
        let mut inner = reduce_inner();
        for _ in 0..3 {
            inner = json!({"type": "tumbling_window", "params": {"size": 1, "inner": inner}});
        }
        let err = registry.build(&spec("tumbling_window", json!({"size": 1, "inner": inner}))).unwrap_err();
        assert!(matches!(err.root_cause(), BuildError::NestingTooDeep { max: 2 }));
    }

    #[test]
    fn test_window_of_windows_is_not_batch_capable() {
        let nested = json!({"type": "tumbling_window", "params": {"size": 1, "inner": reduce_inner()}});
        let err = OperatorRegistry::global()
            .build(&spec("tumbling_window", json!({"size": 2, "inner": nested})))
            .unwrap_err();
        assert!(matches!(err, BuildError::NotBatchCapable { .. }));
    }

    #[test]
    fn test_custom_name_and_registration() {
        let mut registry = OperatorRegistry::new();
        registry.register("tag", build_map);
        let op = registry
            .build(&spec("tag", json!({"col": "a", "val": 1, "name": "tagger"})))
            .unwrap();
        assert_eq!(op.name(), "tagger");
        assert!(!registry.contains("filter"));
    }

    #[test]
    fn test_filter_from_spec_matches_integral_float() {
        let mut op = OperatorRegistry::global()
            .build(&spec("filter", json!({"field": "n", "eq": 1.0})))
            .unwrap();
        let event = Event::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .with_field("n", json!(1));
        assert_eq!(op.process(event).unwrap().len(), 1);
    }
}
