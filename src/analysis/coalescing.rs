//! Global-memory coalescing analysis.
//!
//! Under row-major storage a subscript is unit-stride only when the
//! array's last index is the loop variable occupying the innermost
//! position. PLUTO expresses this per array as the hard constraint
//! `h·∇φ_m ≥ 1`, which is often jointly infeasible (GEMM's `A[i][k]`
//! wants `k` innermost while `B[k][j]` and `C[i][j]` want `j`). The
//! weighted score linearises the constraints into one objective:
//!
//! ```text
//! score = Σ_m w_m · [stride_m == 1]
//! w_m   = freq_m · element_size_m · dimension_size_m · (1.5 if written)
//! ```

use crate::ir::access::MIN_ANALYZABLE_EXTENT;
use crate::ir::{AccessPattern, ScheduleConfig};
use std::collections::BTreeMap;

/// Coarse, config-level coalescing predicate.
///
/// Holds for any configuration with an innermost transformation, whatever
/// its kind; GPU tiling is coalesced by construction and the remaining
/// kinds are not checked here. A configuration without transformations
/// fails. Per-array precision lives in [`check_coalescing_for_pattern`].
pub fn satisfies_coalescing_constraint(config: &ScheduleConfig) -> bool {
    config.innermost().is_some()
}

/// Whether `pattern` is accessed with unit stride under `config`.
pub fn check_coalescing_for_pattern(config: &ScheduleConfig, pattern: &AccessPattern) -> bool {
    match (config.innermost_loop(), pattern.fastest_index()) {
        (Some(inner), Some(fastest)) => inner == fastest,
        _ => false,
    }
}

/// Element stride of `pattern` along the innermost loop of `config`.
///
/// The stride is the product of `dimension_size` over all subscript
/// positions after the (last) position holding the innermost loop
/// variable. When the variable does not appear in the subscripts at all,
/// the stride is `dimension_size²`, a worst-case stand-in rather than a
/// derived value.
///
/// Extents below [`MIN_ANALYZABLE_EXTENT`] are raised to it, so a stride
/// of 1 always means the innermost loop is the fastest subscript.
pub fn compute_stride_for_pattern(config: &ScheduleConfig, pattern: &AccessPattern) -> i64 {
    let extent = pattern.dimension_size.max(MIN_ANALYZABLE_EXTENT);
    let worst_case = extent.saturating_mul(extent);
    let inner = match config.innermost_loop() {
        Some(inner) => inner,
        None => return worst_case,
    };
    match pattern.indices.iter().rposition(|idx| idx == inner) {
        Some(pos) => {
            let minor_axes = pattern.indices.len() - pos - 1;
            (0..minor_axes).fold(1i64, |stride, _| stride.saturating_mul(extent))
        }
        None => worst_case,
    }
}

/// Σ of the weights of all patterns accessed with unit stride.
pub fn compute_weighted_coalescing_score(
    config: &ScheduleConfig,
    patterns: &[AccessPattern],
) -> f64 {
    patterns
        .iter()
        .filter(|p| compute_stride_for_pattern(config, p) == 1)
        .map(|p| p.weight())
        .sum()
}

/// Coalescing status per array name.
pub fn coalescing_status(
    config: &ScheduleConfig,
    patterns: &[AccessPattern],
) -> BTreeMap<String, bool> {
    patterns
        .iter()
        .map(|p| (p.array_name.clone(), check_coalescing_for_pattern(config, p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Transformation;

    fn gemm_patterns() -> Vec<AccessPattern> {
        vec![
            AccessPattern::read_only("A", &["i", "k"]),
            AccessPattern::read_only("B", &["k", "j"]),
            AccessPattern::read_write("C", &["i", "j"]),
        ]
    }

    #[test]
    fn test_coarse_predicate() {
        assert!(!satisfies_coalescing_constraint(&ScheduleConfig::new()));
        assert!(satisfies_coalescing_constraint(&ScheduleConfig::from_loop_order(&["i"])));

        let mut gpu = ScheduleConfig::new();
        gpu.push_transformation(
            Transformation::gpu_tile(vec!["i".into(), "j".into()], vec![0, 1], vec![32, 32])
                .unwrap(),
        );
        assert!(satisfies_coalescing_constraint(&gpu));
    }

    #[test]
    fn test_pattern_coalescing() {
        let ijk = ScheduleConfig::from_loop_order(&["i", "j", "k"]);
        let p = gemm_patterns();
        assert!(check_coalescing_for_pattern(&ijk, &p[0]));
        assert!(!check_coalescing_for_pattern(&ijk, &p[1]));
        assert!(!check_coalescing_for_pattern(&ijk, &p[2]));
        assert!(!check_coalescing_for_pattern(&ScheduleConfig::new(), &p[0]));
    }

    #[test]
    fn test_strides() {
        let ikj = ScheduleConfig::from_loop_order(&["i", "k", "j"]);
        let p = gemm_patterns();
        // A[i][k]: j does not appear
        assert_eq!(compute_stride_for_pattern(&ikj, &p[0]), 1024 * 1024);
        assert_eq!(compute_stride_for_pattern(&ikj, &p[1]), 1);
        assert_eq!(compute_stride_for_pattern(&ikj, &p[2]), 1);

        let jki = ScheduleConfig::from_loop_order(&["j", "k", "i"]);
        assert_eq!(compute_stride_for_pattern(&jki, &p[0]), 1024);

        let t3 = AccessPattern::new("T", &["i", "j", "k"]).dimension_size(8);
        assert_eq!(compute_stride_for_pattern(&jki, &t3), 64);
    }

    #[test]
    fn test_coalescing_matches_unit_stride() {
        let p = gemm_patterns();
        let repeated = AccessPattern::new("D", &["k", "k"]);
        for order in [["i", "j", "k"], ["i", "k", "j"], ["k", "j", "i"]] {
            let config = ScheduleConfig::from_loop_order(&order);
            for pattern in p.iter().chain(std::iter::once(&repeated)) {
                assert_eq!(
                    check_coalescing_for_pattern(&config, pattern),
                    compute_stride_for_pattern(&config, pattern) == 1
                );
            }
        }
    }

    #[test]
    fn test_unit_extent_keeps_stride_consistent() {
        let unit = AccessPattern::new("A", &["i", "k"]).dimension_size(1);
        let ikj = ScheduleConfig::from_loop_order(&["i", "k", "j"]);
        let ijk = ScheduleConfig::from_loop_order(&["i", "j", "k"]);
        let kji = ScheduleConfig::from_loop_order(&["k", "j", "i"]);

        assert_eq!(compute_stride_for_pattern(&ikj, &unit), 4);
        assert_eq!(compute_stride_for_pattern(&ijk, &unit), 1);
        assert_eq!(compute_stride_for_pattern(&kji, &unit), 2);
        for config in [&ikj, &ijk, &kji] {
            assert_eq!(
                check_coalescing_for_pattern(config, &unit),
                compute_stride_for_pattern(config, &unit) == 1
            );
        }

        let patterns = vec![unit];
        assert_eq!(compute_weighted_coalescing_score(&ikj, &patterns), 0.0);
        let status = coalescing_status(&ikj, &patterns);
        assert_eq!(status.get("A"), Some(&false));
    }

    #[test]
    fn test_gemm_scores() {
        let p = gemm_patterns();
        let ijk = ScheduleConfig::from_loop_order(&["i", "j", "k"]);
        let ikj = ScheduleConfig::from_loop_order(&["i", "k", "j"]);
        assert_eq!(compute_weighted_coalescing_score(&ijk, &p), 4096.0);
        assert_eq!(compute_weighted_coalescing_score(&ikj, &p), 16384.0);
    }

    #[test]
    fn test_score_adds_exact_weight() {
        let ikj = ScheduleConfig::from_loop_order(&["i", "k", "j"]);
        let mut patterns = vec![AccessPattern::read_only("B", &["k", "j"])];
        let before = compute_weighted_coalescing_score(&ikj, &patterns);

        let extra = AccessPattern::read_write("E", &["j"]).element_size(8);
        patterns.push(extra.clone());
        let after = compute_weighted_coalescing_score(&ikj, &patterns);
        assert_eq!(after - before, extra.weight());
    }

    #[test]
    fn test_status_table() {
        let ikj = ScheduleConfig::from_loop_order(&["i", "k", "j"]);
        let status = coalescing_status(&ikj, &gemm_patterns());
        assert_eq!(status.get("A"), Some(&false));
        assert_eq!(status.get("B"), Some(&true));
        assert_eq!(status.get("C"), Some(&true));
    }
}
