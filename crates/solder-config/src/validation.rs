//! Settings and topology validation.
//!
//! Validation runs over the parsed documents before anything is registered,
//! so that every problem in a file is reported at once instead of stopping
//! at the first registration error.
//!
//! # Example
//!
//! ```rust
//! use solder_config::{TopologySpec, validate_topology};
//!
//! let spec = TopologySpec::from_toml("[[schedulers]]\nname = \"a\"").unwrap();
//! validate_topology(&spec).expect("a single scheduler is valid");
//! ```

use std::collections::HashSet;

use solder_core::{SchedulerType, SolderType, is_valid_name};
use thiserror::Error;

use crate::topology::TopologySpec;
use crate::wiring_config::WiringConfig;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A scheduler, input or edge endpoint has an illegal name.
    #[error("invalid {kind} name '{name}'")]
    InvalidName {
        /// What was being named.
        kind: &'static str,
        /// The offending name.
        name: String,
    },

    /// Two schedulers share a name.
    #[error("scheduler '{0}' is declared more than once")]
    DuplicateScheduler(String),

    /// Unknown scheduler type.
    #[error("unknown type '{value}' for scheduler '{scheduler}'")]
    UnknownSchedulerType {
        /// Scheduler name.
        scheduler: String,
        /// The unrecognized type.
        value: String,
    },

    /// A capacity of zero admits nothing.
    #[error("scheduler '{0}' has a capacity of zero")]
    ZeroCapacity(String),

    /// An input refers to a scheduler that is not declared.
    #[error("input '{input}' refers to undeclared scheduler '{scheduler}'")]
    UnknownScheduler {
        /// Scheduler name.
        scheduler: String,
        /// Input wire name.
        input: String,
    },

    /// The same input is declared twice on one scheduler.
    #[error("input '{scheduler}.{input}' is declared more than once")]
    DuplicateInput {
        /// Scheduler name.
        scheduler: String,
        /// Input wire name.
        input: String,
    },

    /// Unknown solder type.
    #[error("unknown solder '{value}' on edge {from} -> {to} ({input})")]
    UnknownSolderType {
        /// Origin vertex.
        from: String,
        /// Destination vertex.
        to: String,
        /// Destination input.
        input: String,
        /// The unrecognized solder type.
        value: String,
    },

    /// The same edge is declared twice.
    #[error("edge {from} -> {to} ({input}) is declared more than once")]
    DuplicateEdge {
        /// Origin vertex.
        from: String,
        /// Destination vertex.
        to: String,
        /// Destination input.
        input: String,
    },

    /// A period setting is zero.
    #[error("'{0}' must be greater than zero")]
    ZeroPeriod(&'static str),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

/// Checks runtime settings.
pub fn validate_config(config: &WiringConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();
    if config.health_monitor_period_ms == 0 {
        errors.push(ValidationError::ZeroPeriod("health_monitor_period_ms"));
    }
    if config.health_log_interval_ms == 0 {
        errors.push(ValidationError::ZeroPeriod("health_log_interval_ms"));
    }
    collect(errors)
}

/// Lists every problem in a topology document.
pub fn topology_problems(spec: &TopologySpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut schedulers = HashSet::new();
    for scheduler in &spec.schedulers {
        if !is_valid_name(&scheduler.name) {
            errors.push(ValidationError::InvalidName {
                kind: "scheduler",
                name: scheduler.name.clone(),
            });
        }
        if !schedulers.insert(scheduler.name.as_str()) {
            errors.push(ValidationError::DuplicateScheduler(scheduler.name.clone()));
        }
        if SchedulerType::parse(&scheduler.scheduler_type).is_none() {
            errors.push(ValidationError::UnknownSchedulerType {
                scheduler: scheduler.name.clone(),
                value: scheduler.scheduler_type.clone(),
            });
        }
        if scheduler.capacity == Some(0) {
            errors.push(ValidationError::ZeroCapacity(scheduler.name.clone()));
        }
    }

    let mut inputs = HashSet::new();
    for input in &spec.inputs {
        if !is_valid_name(&input.name) {
            errors.push(ValidationError::InvalidName {
                kind: "input",
                name: input.name.clone(),
            });
        }
        if !schedulers.contains(input.scheduler.as_str()) {
            errors.push(ValidationError::UnknownScheduler {
                scheduler: input.scheduler.clone(),
                input: input.name.clone(),
            });
        }
        if !inputs.insert((input.scheduler.as_str(), input.name.as_str())) {
            errors.push(ValidationError::DuplicateInput {
                scheduler: input.scheduler.clone(),
                input: input.name.clone(),
            });
        }
    }

    let mut edges = HashSet::new();
    for edge in &spec.edges {
        for endpoint in [&edge.from, &edge.to] {
            if !is_valid_name(endpoint) {
                errors.push(ValidationError::InvalidName {
                    kind: "edge endpoint",
                    name: endpoint.clone(),
                });
            }
        }
        if !edge.auto_inserted && SolderType::parse(&edge.solder).is_none() {
            errors.push(ValidationError::UnknownSolderType {
                from: edge.from.clone(),
                to: edge.to.clone(),
                input: edge.input.clone(),
                value: edge.solder.clone(),
            });
        }
        if !edges.insert((edge.from.as_str(), edge.to.as_str(), edge.input.as_str())) {
            errors.push(ValidationError::DuplicateEdge {
                from: edge.from.clone(),
                to: edge.to.clone(),
                input: edge.input.clone(),
            });
        }
    }

    errors
}

/// Checks a topology document; several problems come back as [`ValidationError::Multiple`].
pub fn validate_topology(spec: &TopologySpec) -> ValidationResult<()> {
    collect(topology_problems(spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{EdgeSpec, InputSpec, SchedulerSpec};

    fn input(scheduler: &str, name: &str) -> InputSpec {
        InputSpec {
            scheduler: scheduler.into(),
            name: name.into(),
            bound: true,
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&WiringConfig::default()).is_ok());
    }

    #[test]
    fn zero_periods_are_reported_together() {
        let config = WiringConfig {
            health_monitor_period_ms: 0,
            health_log_interval_ms: 0,
            ..WiringConfig::default()
        };
        match validate_config(&config) {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected two errors, got {other:?}"),
        }
    }

    #[test]
    fn single_problem_is_not_wrapped() {
        let config = WiringConfig {
            health_monitor_period_ms: 0,
            ..WiringConfig::default()
        };
        assert_eq!(
            validate_config(&config),
            Err(ValidationError::ZeroPeriod("health_monitor_period_ms"))
        );
    }

    #[test]
    fn valid_topology_passes() {
        let spec = TopologySpec {
            name: None,
            schedulers: vec![SchedulerSpec::new("a"), SchedulerSpec::new("b")],
            inputs: vec![input("b", "in")],
            edges: vec![EdgeSpec::new("a", "b", "in"), EdgeSpec::new("b", "sink", "out")],
        };
        assert!(validate_topology(&spec).is_ok());
    }

    #[test]
    fn scheduler_problems() {
        let spec = TopologySpec {
            schedulers: vec![
                SchedulerSpec::new("bad name"),
                SchedulerSpec::new("a"),
                SchedulerSpec::new("a"),
                SchedulerSpec {
                    scheduler_type: "FAST".into(),
                    capacity: Some(0),
                    ..SchedulerSpec::new("c")
                },
            ],
            ..TopologySpec::default()
        };
        let problems = topology_problems(&spec);
        assert_eq!(problems.len(), 4);
        assert!(problems.contains(&ValidationError::DuplicateScheduler("a".into())));
        assert!(problems.contains(&ValidationError::ZeroCapacity("c".into())));
        assert!(matches!(problems[0], ValidationError::InvalidName { kind: "scheduler", .. }));
    }

    #[test]
    fn input_must_reference_declared_scheduler() {
        let spec = TopologySpec {
            schedulers: vec![SchedulerSpec::new("a")],
            inputs: vec![input("ghost", "in"), input("a", "x"), input("a", "x")],
            ..TopologySpec::default()
        };
        let problems = topology_problems(&spec);
        assert_eq!(
            problems,
            vec![
                ValidationError::UnknownScheduler {
                    scheduler: "ghost".into(),
                    input: "in".into(),
                },
                ValidationError::DuplicateInput {
                    scheduler: "a".into(),
                    input: "x".into(),
                },
            ]
        );
    }

    #[test]
    fn edges_may_reference_undeclared_vertices() {
        let spec = TopologySpec {
            edges: vec![EdgeSpec::new("left", "right", "in")],
            ..TopologySpec::default()
        };
        assert!(topology_problems(&spec).is_empty());
    }

    #[test]
    fn edge_problems() {
        let spec = TopologySpec {
            edges: vec![
                EdgeSpec {
                    solder: "shove".into(),
                    ..EdgeSpec::new("a", "b", "in")
                },
                EdgeSpec::new("a", "b", "in"),
                EdgeSpec::new("a", "no-dash", "in"),
            ],
            ..TopologySpec::default()
        };
        let problems = topology_problems(&spec);
        assert_eq!(problems.len(), 3);
        assert!(matches!(problems[0], ValidationError::UnknownSolderType { .. }));
        assert!(matches!(problems[1], ValidationError::DuplicateEdge { .. }));
        assert!(matches!(problems[2], ValidationError::InvalidName { kind: "edge endpoint", .. }));
    }

    #[test]
    fn multiple_display_joins_messages() {
        let err = ValidationError::Multiple(vec![
            ValidationError::ZeroCapacity("a".into()),
            ValidationError::DuplicateScheduler("b".into()),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("capacity of zero"));
        assert!(msg.contains("; "));
    }
}
