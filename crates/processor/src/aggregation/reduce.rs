//! Group-by batch aggregation
//!
//! [`ReduceOperator`] is the batch aggregator placed inside windows. It groups a
//! closed window by the string form of one field and emits one summary event per
//! group.

use super::avg::AverageAggregator;
use super::count::CountAggregator;
use super::minmax::{MaxAggregator, MinAggregator};
use super::sum::SumAggregator;
use super::trait_::{Aggregator, ToF64};
use crate::error::{AggregationError, BuildError, BuildResult, Result};
use crate::pipeline::operator::{BatchOperator, StreamOperator};
use chrono::{DateTime, Utc};
use dataflow_types::Event;
use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::fmt;
use tracing::{trace, warn};

/// Aggregate computed per group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateKind {
    /// Parse the `agg` parameter
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "avg" | "mean" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    /// Name used as the output field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Whether the aggregate reads a numeric `field`
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Count)
    }

    fn aggregator(&self) -> Box<dyn Aggregator> {
        match self {
            Self::Count => Box::new(CountAggregator::new()),
            Self::Sum => Box::new(SumAggregator::new()),
            Self::Avg => Box::new(AverageAggregator::new()),
            Self::Min => Box::new(MinAggregator::new()),
            Self::Max => Box::new(MaxAggregator::new()),
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch aggregator grouping events by a key field
///
/// Output events carry `{<key>: <group>, "count": n}`; numeric aggregates add
/// `{<agg>: <value>}` computed over `field`. Groups are emitted in the order
/// they first appear in the batch.
#[derive(Debug, Clone)]
pub struct ReduceOperator {
    name: String,
    key: String,
    kind: AggregateKind,
    field: Option<String>,
}

struct Group {
    size: u64,
    latest: DateTime<Utc>,
    aggregator: Box<dyn Aggregator>,
}

impl ReduceOperator {
    /// Count events per group
    pub fn count(key: impl Into<String>) -> Self {
        Self {
            name: "reduce".to_string(),
            key: key.into(),
            kind: AggregateKind::Count,
            field: None,
        }
    }

    /// Build a reduce operator, validating that numeric aggregates have a field
    pub fn new(
        key: impl Into<String>,
        kind: AggregateKind,
        field: Option<String>,
    ) -> BuildResult<Self> {
        if kind.is_numeric() && field.is_none() {
            return Err(BuildError::MissingParam {
                component: "reduce".to_string(),
                param: "field".to_string(),
            });
        }
        Ok(Self {
            name: "reduce".to_string(),
            key: key.into(),
            kind,
            field,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> AggregateKind {
        self.kind
    }

    /// String form of the grouping field; missing values group under "null"
    fn group_key(&self, event: &Event) -> String {
        match event.get(&self.key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "null".to_string(),
        }
    }
}

impl StreamOperator for ReduceOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, _event: Event) -> Result<Vec<Event>> {
        Err(AggregationError::OutsideWindow {
            operator: self.name.clone(),
        }
        .into())
    }

    fn as_batch(&self) -> Option<&dyn BatchOperator> {
        Some(self)
    }
}

impl BatchOperator for ReduceOperator {
    fn process_batch(&self, events: &[Event]) -> Result<Vec<Event>> {
        let mut groups: IndexMap<String, Group> = IndexMap::new();

        for event in events {
            let group = groups
                .entry(self.group_key(event))
                .or_insert_with(|| Group {
                    size: 0,
                    latest: event.timestamp,
                    aggregator: self.kind.aggregator(),
                });
            group.size += 1;
            if event.timestamp > group.latest {
                group.latest = event.timestamp;
            }

            match &self.field {
                Some(field) if self.kind.is_numeric() => match event.get(field).and_then(ToF64::to_f64) {
                    Some(value) => group.aggregator.update(value),
                    None => warn!(
                        operator = %self.name,
                        field = %field,
                        "skipping non-numeric value in aggregation"
                    ),
                },
                _ => group.aggregator.update(1.0),
            }
        }

        trace!(operator = %self.name, groups = groups.len(), batch = events.len(), "reduced batch");

        Ok(groups
            .into_iter()
            .map(|(group, state)| {
                let mut summary = Event::new(state.latest)
                    .with_field(self.key.clone(), group)
                    .with_field("count", state.size);
                if self.kind.is_numeric() {
                    let value = state
                        .aggregator
                        .finalize()
                        .and_then(Number::from_f64)
                        .map(Value::Number)
                        .unwrap_or(Value::Null);
                    summary.set(self.kind.as_str(), value);
                }
                summary
            })
            .collect())
    }
}
