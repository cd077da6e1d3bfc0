//! # Redundancy Policy
//!
//! Pure normalization from a partial user spec to a complete, VCH-valid
//! `RedundancyOptions` set. Applied client-side before the RPC; the
//! gateway passes the options through to the work-creation command
//! untouched.

use thiserror::Error;

use crate::proto::v1::RedundancyOptions;

/// Rejected partial redundancy spec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RedundancyError {
    #[error("target_nresults must be at least min_quorum, got {target_nresults} and {min_quorum}")]
    TargetBelowQuorum {
        target_nresults: i32,
        min_quorum: i32,
    },
}

/// Partial redundancy spec; unset fields are filled by [`normalize`](Self::normalize).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedundancySpec {
    pub min_quorum: Option<i32>,
    pub target_nresults: Option<i32>,
    pub max_error_results: Option<i32>,
    pub max_total_results: Option<i32>,
    pub max_success_results: Option<i32>,
    pub delay_bound: Option<i32>,
}

impl RedundancySpec {
    /// Fill defaults and validate ordering constraints.
    ///
    /// Defaults: quorum 2, target = quorum, 3 total results, error budget
    /// sized so a strict majority of the quorum remains collectable, and a
    /// 300-second delay bound.
    pub fn normalize(self) -> Result<RedundancyOptions, RedundancyError> {
        let min_quorum = self.min_quorum.unwrap_or(2);

        let target_nresults = match self.target_nresults {
            None => min_quorum,
            Some(t) if t < min_quorum => {
                return Err(RedundancyError::TargetBelowQuorum {
                    target_nresults: t,
                    min_quorum,
                })
            }
            Some(t) => t,
        };

        let max_total_results = self.max_total_results.unwrap_or(3);

        // Default budget keeps a strict majority of min_quorum collectable.
        let mut max_error_results = self
            .max_error_results
            .unwrap_or(max_total_results - (min_quorum / 2 + 1));
        if max_error_results == 0 {
            // 0 is not allowed by the VCH
            max_error_results = 1;
        }

        let max_success_results = self.max_success_results.unwrap_or(max_total_results);

        let delay_bound = self.delay_bound.unwrap_or(300);

        Ok(RedundancyOptions {
            min_quorum,
            target_nresults,
            max_error_results,
            max_total_results,
            max_success_results,
            delay_bound,
        })
    }
}

impl RedundancyOptions {
    /// Single replica, no redundancy. For trusted single-worker scenarios
    /// such as gradient computation on dedicated nodes.
    pub fn trivial() -> Self {
        RedundancySpec {
            min_quorum: Some(1),
            target_nresults: Some(1),
            max_error_results: Some(0),
            max_total_results: Some(1),
            max_success_results: Some(1),
            delay_bound: None,
        }
        .normalize()
        .expect("trivial preset is always valid")
    }

    /// All defaults: quorum of 2 out of up to 3 replicas.
    pub fn classic() -> Self {
        RedundancySpec::default()
            .normalize()
            .expect("default spec is always valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- defaults ----

    #[test]
    fn test_all_defaults() {
        let opts = RedundancySpec::default().normalize().unwrap();
        assert_eq!(opts.min_quorum, 2);
        assert_eq!(opts.target_nresults, 2);
        assert_eq!(opts.max_total_results, 3);
        assert_eq!(opts.max_error_results, 1); // 3 - (2/2 + 1)
        assert_eq!(opts.max_success_results, 3);
        assert_eq!(opts.delay_bound, 300);
    }

    #[test]
    fn test_target_defaults_to_quorum() {
        let opts = RedundancySpec {
            min_quorum: Some(5),
            max_total_results: Some(9),
            ..Default::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(opts.target_nresults, 5);
        // 9 - (5/2 + 1) = 6
        assert_eq!(opts.max_error_results, 6);
    }

    #[test]
    fn test_target_below_quorum_rejected() {
        let err = RedundancySpec {
            min_quorum: Some(3),
            target_nresults: Some(2),
            ..Default::default()
        }
        .normalize()
        .unwrap_err();
        assert_eq!(
            err,
            RedundancyError::TargetBelowQuorum {
                target_nresults: 2,
                min_quorum: 3
            }
        );
    }

    #[test]
    fn test_explicit_zero_error_budget_is_bumped() {
        // The VCH forbids max_error_results = 0, even when asked for explicitly.
        let opts = RedundancySpec {
            max_error_results: Some(0),
            ..Default::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(opts.max_error_results, 1);
    }

    #[test]
    fn test_computed_zero_error_budget_is_bumped() {
        // 2 - (2/2 + 1) = 0, bumped to 1.
        let opts = RedundancySpec {
            max_total_results: Some(2),
            ..Default::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(opts.max_error_results, 1);
    }

    // ---- presets ----

    #[test]
    fn test_trivial_preset() {
        let opts = RedundancyOptions::trivial();
        assert_eq!(opts.min_quorum, 1);
        assert_eq!(opts.target_nresults, 1);
        assert_eq!(opts.max_error_results, 1);
        assert_eq!(opts.max_total_results, 1);
        assert_eq!(opts.max_success_results, 1);
        assert_eq!(opts.delay_bound, 300);
    }

    #[test]
    fn test_classic_preset_matches_defaults() {
        assert_eq!(
            RedundancyOptions::classic(),
            RedundancySpec::default().normalize().unwrap()
        );
    }

    // ---- normalized invariants ----

    #[test]
    fn test_normalized_specs_satisfy_vch_constraints() {
        let partials = [
            RedundancySpec::default(),
            RedundancySpec {
                min_quorum: Some(1),
                ..Default::default()
            },
            RedundancySpec {
                min_quorum: Some(4),
                max_total_results: Some(4),
                ..Default::default()
            },
            RedundancySpec {
                max_total_results: Some(2),
                ..Default::default()
            },
            RedundancySpec {
                min_quorum: Some(3),
                target_nresults: Some(7),
                max_total_results: Some(10),
                delay_bound: Some(600),
                ..Default::default()
            },
        ];
        for partial in partials {
            let opts = partial.clone().normalize().unwrap();
            assert!(
                opts.target_nresults >= opts.min_quorum,
                "target >= quorum violated for {partial:?}"
            );
            assert!(
                opts.max_error_results >= 1,
                "error budget of zero for {partial:?}"
            );
            assert!(
                opts.max_success_results <= opts.max_total_results,
                "success cap above total cap for {partial:?}"
            );
        }
    }
}
