//! Input validation for problem instances.
//!
//! Checks structural integrity of an [`Instance`] before simulation.
//! Detects:
//! - Duplicate ids (machines, transports, jobs, operations, buffers)
//! - Operations referencing unknown machines
//! - Jobs without operations
//! - Zero-capacity buffers
//! - Missing Output-role buffer
//! - Setup-time tables with non-zero diagonal entries
//! - Transports starting at unknown locations
//! - Degenerate stochastic distribution parameters
//!
//! All detected issues are reported together; the caller decides whether
//! to abort or surface them.

use std::collections::HashSet;

use crate::models::{Instance, TimeSource};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same id.
    DuplicateId,
    /// An entity references an id that does not exist.
    UnknownReference,
    /// A job has no operations.
    EmptyJob,
    /// A buffer cannot hold anything.
    InvalidCapacity,
    /// No Output-role buffer exists to deliver jobs into.
    MissingOutputBuffer,
    /// A setup table maps a tool onto itself with non-zero cost.
    InvalidSetupTimes,
    /// A stochastic duration has unusable parameters.
    InvalidDistribution,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates an instance.
///
/// Checks:
/// 1. No duplicate component ids anywhere (machines, transports, jobs,
///    operations, buffers — machine-owned buffers included)
/// 2. All jobs have at least one operation
/// 3. Every operation targets an existing machine
/// 4. Every buffer has capacity ≥ 1
/// 5. An Output-role buffer exists
/// 6. Setup tables have no non-zero diagonal entry
/// 7. Transports start at known locations
/// 8. Stochastic parameters are usable (positive mean / std / shape / scale)
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with every detected issue.
pub fn validate_instance(instance: &Instance) -> ValidationResult {
    let mut errors = Vec::new();

    // Component id uniqueness, one namespace across the whole instance
    let mut seen: HashSet<String> = HashSet::new();
    let mut require_unique = |value: &str, what: &str, errors: &mut Vec<ValidationError>| {
        if !seen.insert(value.to_string()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {what} id: {value}"),
            ));
        }
    };

    for m in &instance.machines {
        require_unique(&m.id, "machine", &mut errors);
    }
    for t in &instance.transports {
        require_unique(&t.id, "transport", &mut errors);
    }
    for j in &instance.jobs {
        require_unique(&j.id, "job", &mut errors);
        for o in &j.operations {
            require_unique(&o.id, "operation", &mut errors);
        }
    }
    for b in instance.all_buffers() {
        require_unique(&b.id, "buffer", &mut errors);
    }

    let machine_ids: HashSet<&str> = instance.machines.iter().map(|m| m.id.as_str()).collect();

    for job in &instance.jobs {
        if job.operations.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyJob,
                format!("Job '{}' has no operations", job.id),
            ));
        }
        for op in &job.operations {
            if !machine_ids.contains(op.machine.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownReference,
                    format!(
                        "Operation '{}' targets unknown machine '{}'",
                        op.id, op.machine
                    ),
                ));
            }
            check_distribution(&op.duration, &op.id, &mut errors);
        }
    }

    for buffer in instance.all_buffers() {
        if buffer.capacity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidCapacity,
                format!("Buffer '{}' has zero capacity", buffer.id),
            ));
        }
    }

    if instance.output_buffer().is_none() {
        errors.push(ValidationError::new(
            ValidationErrorKind::MissingOutputBuffer,
            "No Output-role buffer declared; jobs cannot be delivered",
        ));
    }

    for machine in &instance.machines {
        for ((from, to), duration) in &machine.setup_times {
            if from == to && duration.nominal() != 0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidSetupTimes,
                    format!(
                        "Machine '{}' maps tool '{}' onto itself with non-zero setup",
                        machine.id, from
                    ),
                ));
            }
            check_distribution(duration, &machine.id, &mut errors);
        }
        for outage in &machine.outages {
            check_distribution(&outage.frequency, &machine.id, &mut errors);
            check_distribution(&outage.duration, &machine.id, &mut errors);
        }
    }

    let known_locations: HashSet<String> = instance
        .machines
        .iter()
        .map(|m| m.id.clone())
        .chain(instance.all_buffers().map(|b| b.id.clone()))
        .collect();
    for transport in &instance.transports {
        let start = instance.canonical_location(&transport.location);
        if !known_locations.contains(&start) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownReference,
                format!(
                    "Transport '{}' starts at unknown location '{}'",
                    transport.id, transport.location
                ),
            ));
        }
        for outage in &transport.outages {
            check_distribution(&outage.frequency, &transport.id, &mut errors);
            check_distribution(&outage.duration, &transport.id, &mut errors);
        }
    }

    for duration in instance.travel_times.values() {
        check_distribution(duration, "travel-time matrix", &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Rejects distribution parameters the sampler cannot honor.
fn check_distribution(source: &TimeSource, owner: &str, errors: &mut Vec<ValidationError>) {
    let bad = match source {
        TimeSource::Fixed(_) => false,
        TimeSource::Poisson { mean, .. } => *mean <= 0.0,
        TimeSource::Normal { std, .. } => *std <= 0.0,
        TimeSource::Gamma { shape, scale, .. } => *shape <= 0.0 || *scale <= 0.0,
    };
    if bad {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidDistribution,
            format!("Unusable distribution parameters on '{owner}': {source:?}"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobConfig, MachineConfig, OperationConfig, TransportConfig};

    fn valid_instance() -> Instance {
        Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_machine(MachineConfig::new("m-1"))
            .with_job(
                JobConfig::new("j-0")
                    .with_operation(OperationConfig::new("o-0", "m-0", 3))
                    .with_operation(OperationConfig::new("o-1", "m-1", 2)),
            )
            .with_default_buffers()
    }

    #[test]
    fn test_valid_instance() {
        assert!(validate_instance(&valid_instance()).is_ok());
    }

    #[test]
    fn test_duplicate_machine_id() {
        let instance = valid_instance().with_machine(MachineConfig::new("m-0"));
        let errors = validate_instance(&instance).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId));
    }

    #[test]
    fn test_empty_job() {
        let instance = valid_instance().with_job(JobConfig::new("j-empty"));
        let errors = validate_instance(&instance).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::EmptyJob));
    }

    #[test]
    fn test_unknown_machine_reference() {
        let instance = valid_instance()
            .with_job(JobConfig::new("j-x").with_operation(OperationConfig::new("o-x", "m-9", 1)));
        let errors = validate_instance(&instance).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownReference));
    }

    #[test]
    fn test_missing_output_buffer() {
        // no with_default_buffers: only machine-owned buffers exist
        let instance = Instance::new()
            .with_machine(MachineConfig::new("m-0"))
            .with_job(JobConfig::new("j-0").with_operation(OperationConfig::new("o-0", "m-0", 1)));
        let errors = validate_instance(&instance).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MissingOutputBuffer));
    }

    #[test]
    fn test_setup_diagonal_rejected() {
        let instance = Instance::new()
            .with_machine(MachineConfig::new("m-0").with_setup_time("tl-0", "tl-0", 5u64))
            .with_job(JobConfig::new("j-0").with_operation(OperationConfig::new("o-0", "m-0", 1)))
            .with_default_buffers();
        let errors = validate_instance(&instance).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidSetupTimes));
    }

    #[test]
    fn test_zero_diagonal_accepted() {
        let instance = Instance::new()
            .with_machine(MachineConfig::new("m-0").with_setup_time("tl-0", "tl-0", 0u64))
            .with_job(JobConfig::new("j-0").with_operation(OperationConfig::new("o-0", "m-0", 1)))
            .with_default_buffers();
        assert!(validate_instance(&instance).is_ok());
    }

    #[test]
    fn test_unknown_transport_start() {
        let instance = valid_instance().with_transport(TransportConfig::new("t-0", "nowhere"));
        let errors = validate_instance(&instance).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownReference));
    }

    #[test]
    fn test_transport_alias_start_accepted() {
        let instance = valid_instance().with_transport(TransportConfig::new("t-0", "input"));
        assert!(validate_instance(&instance).is_ok());
    }

    #[test]
    fn test_bad_distribution_parameters() {
        let instance = valid_instance().with_job(
            JobConfig::new("j-p").with_operation(
                OperationConfig::new("o-p", "m-0", 1)
                    .with_duration(TimeSource::Poisson { base: 1, mean: 0.0 }),
            ),
        );
        let errors = validate_instance(&instance).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidDistribution));
    }

    #[test]
    fn test_multiple_errors_accumulate() {
        let instance = Instance::new()
            .with_job(JobConfig::new("j-0"))
            .with_job(JobConfig::new("j-0"));
        let errors = validate_instance(&instance).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
