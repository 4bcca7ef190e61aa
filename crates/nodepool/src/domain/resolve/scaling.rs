use api_types::NodePoolSpec;
use api_types::ScalingMode;
use api_types::DEFAULT_AUTOSCALING_MAX_NODES;
use api_types::DEFAULT_AUTOSCALING_MIN_NODES;

use crate::domain::errors::ValidationError;

/// Sizing fields of a node pool spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingRequest {
    pub static_node_count: Option<u32>,
    pub autoscaling_min: u32,
    pub autoscaling_max: u32,
    pub initial_node_count: Option<u32>,
}

impl Default for ScalingRequest {
    fn default() -> Self {
        Self {
            static_node_count: None,
            autoscaling_min: DEFAULT_AUTOSCALING_MIN_NODES,
            autoscaling_max: DEFAULT_AUTOSCALING_MAX_NODES,
            initial_node_count: None,
        }
    }
}

impl From<&NodePoolSpec> for ScalingRequest {
    fn from(spec: &NodePoolSpec) -> Self {
        Self {
            static_node_count: spec.static_node_count,
            autoscaling_min: spec.autoscaling_total_min_nodes,
            autoscaling_max: spec.autoscaling_total_max_nodes,
            initial_node_count: spec.initial_node_count,
        }
    }
}

impl ScalingRequest {
    /// The caller moved either autoscaling bound off its default.
    fn autoscale_requested(&self) -> bool {
        self.autoscaling_min != DEFAULT_AUTOSCALING_MIN_NODES
            || self.autoscaling_max != DEFAULT_AUTOSCALING_MAX_NODES
    }

    fn initial_requested(&self) -> Option<u32> {
        self.initial_node_count.filter(|count| *count > 0)
    }
}

/// Determines the scaling mode, reporting every violated rule.
pub fn resolve_scaling_mode(request: ScalingRequest) -> Result<ScalingMode, Vec<ValidationError>> {
    let ScalingRequest {
        static_node_count,
        autoscaling_min: min,
        autoscaling_max: max,
        ..
    } = request;
    let initial = request.initial_requested();
    let mut errors = Vec::new();

    if static_node_count.is_some() && request.autoscale_requested() {
        errors.push(ValidationError::StaticWithAutoscaling { min, max });
    }
    if static_node_count.is_some() && initial.is_some() {
        errors.push(ValidationError::StaticWithInitial);
    }
    if let Some(initial) = initial {
        if initial < min || initial > max {
            errors.push(ValidationError::InitialOutOfBounds { initial, min, max });
        }
    }
    if static_node_count.is_none() && min > max {
        errors.push(ValidationError::AutoscalingBoundsInverted { min, max });
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(match (static_node_count, initial) {
        (Some(node_count), _) => ScalingMode::Static { node_count },
        (None, Some(initial)) => ScalingMode::AutoscalingWithSeed { min, max, initial },
        (None, None) => ScalingMode::Autoscaling { min, max },
    })
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn static_count_with_default_bounds() {
        let request = ScalingRequest {
            static_node_count: Some(3),
            ..Default::default()
        };

        assert_eq!(
            resolve_scaling_mode(request),
            Ok(ScalingMode::Static { node_count: 3 })
        );
    }

    #[test]
    fn static_count_conflicts_with_autoscaling_min() {
        let request = ScalingRequest {
            static_node_count: Some(3),
            autoscaling_min: 1,
            ..Default::default()
        };

        assert_eq!(
            resolve_scaling_mode(request),
            Err(vec![ValidationError::StaticWithAutoscaling { min: 1, max: 1000 }])
        );
    }

    #[test]
    fn static_count_conflicts_with_autoscaling_max() {
        let request = ScalingRequest {
            static_node_count: Some(0),
            autoscaling_max: 10,
            ..Default::default()
        };

        assert_eq!(
            resolve_scaling_mode(request),
            Err(vec![ValidationError::StaticWithAutoscaling { min: 0, max: 10 }])
        );
    }

    #[test]
    fn defaults_mean_autoscaling() {
        assert_eq!(
            resolve_scaling_mode(ScalingRequest::default()),
            Ok(ScalingMode::Autoscaling { min: 0, max: 1000 })
        );
    }

    #[test]
    fn zero_initial_count_is_ignored() {
        let request = ScalingRequest {
            static_node_count: Some(2),
            initial_node_count: Some(0),
            ..Default::default()
        };

        assert_eq!(
            resolve_scaling_mode(request),
            Ok(ScalingMode::Static { node_count: 2 })
        );
    }

    #[test]
    fn initial_count_seeds_autoscaling() {
        let request = ScalingRequest {
            autoscaling_min: 2,
            autoscaling_max: 8,
            initial_node_count: Some(4),
            ..Default::default()
        };

        assert_eq!(
            resolve_scaling_mode(request),
            Ok(ScalingMode::AutoscalingWithSeed {
                min: 2,
                max: 8,
                initial: 4
            })
        );
    }

    #[test]
    fn initial_count_bounds_are_inclusive() {
        for initial in [2, 8] {
            let request = ScalingRequest {
                autoscaling_min: 2,
                autoscaling_max: 8,
                initial_node_count: Some(initial),
                ..Default::default()
            };
            assert!(resolve_scaling_mode(request).is_ok());
        }
    }

    #[test]
    fn initial_count_outside_bounds_fails() {
        let request = ScalingRequest {
            autoscaling_min: 2,
            autoscaling_max: 8,
            initial_node_count: Some(9),
            ..Default::default()
        };

        assert_eq!(
            resolve_scaling_mode(request),
            Err(vec![ValidationError::InitialOutOfBounds {
                initial: 9,
                min: 2,
                max: 8
            }])
        );
    }

    #[test]
    fn every_violated_rule_is_reported() {
        let request = ScalingRequest {
            static_node_count: Some(3),
            autoscaling_min: 5,
            autoscaling_max: 6,
            initial_node_count: Some(1),
        };

        assert_eq!(
            resolve_scaling_mode(request),
            Err(vec![
                ValidationError::StaticWithAutoscaling { min: 5, max: 6 },
                ValidationError::StaticWithInitial,
                ValidationError::InitialOutOfBounds {
                    initial: 1,
                    min: 5,
                    max: 6
                },
            ])
        );
    }

    #[test]
    fn inverted_bounds_fail() {
        let request = ScalingRequest {
            autoscaling_min: 10,
            autoscaling_max: 5,
            ..Default::default()
        };

        assert_eq!(
            resolve_scaling_mode(request),
            Err(vec![ValidationError::AutoscalingBoundsInverted { min: 10, max: 5 }])
        );
    }
}
