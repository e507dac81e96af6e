//! Candidate generators.
//!
//! Three strategies produce candidates from a baseline:
//!
//! - **optimal neighbors**: the baseline plus uniform tile variants
//! - **all legal**: every loop order crossed with the per-dimension tile menu
//! - **constraint sampling**: the baseline plus a smaller set of tile samples
//!
//! Every candidate leaves the generator annotated against the registered
//! access patterns.

use super::ConstraintSolver;
use crate::analysis::{
    compute_weighted_coalescing_score, count_retained_orders, loop_orders,
    satisfies_coalescing_constraint,
};
use crate::ir::baseline::default_iterator_name;
use crate::ir::{BaselineSchedule, ScheduleConfig};
use log::{debug, info, warn};

impl ConstraintSolver {
    /// The baseline as an interchange-only configuration.
    ///
    /// Loops follow the matrix-hint order when it is a permutation and
    /// declaration order otherwise. `None` for an empty program or a
    /// zero-depth statement.
    pub fn baseline_config(&self, baseline: &BaselineSchedule) -> Option<ScheduleConfig> {
        let stmt = baseline.primary()?;
        if stmt.dim == 0 {
            return None;
        }
        let order = stmt.ordered_iterators();
        Some(ScheduleConfig::from_loop_order(&order).with_description("baseline"))
    }

    /// Baseline plus up to `k - 1` uniform tile variants from the neighbor menu.
    pub fn generate_candidates_from_optimal(
        &self,
        baseline: &BaselineSchedule,
        k: usize,
    ) -> Vec<ScheduleConfig> {
        let candidates =
            self.baseline_with_variants(baseline, k, &self.config.neighbor_tile_sizes, "neighbor");
        info!("generated {} neighbor candidate(s) (k = {})", candidates.len(), k);
        candidates
    }

    /// Baseline plus up to `n - 1` tile samples from the sampling menu.
    pub fn generate_by_constraint_sampling(
        &self,
        baseline: &BaselineSchedule,
        n: usize,
    ) -> Vec<ScheduleConfig> {
        let candidates =
            self.baseline_with_variants(baseline, n, &self.config.sampling_tile_sizes, "sample");
        info!("generated {} sampled candidate(s) (n = {})", candidates.len(), n);
        candidates
    }

    fn baseline_with_variants(
        &self,
        baseline: &BaselineSchedule,
        limit: usize,
        menu: &[i64],
        label: &str,
    ) -> Vec<ScheduleConfig> {
        if limit == 0 {
            return Vec::new();
        }
        let base = match self.baseline_config(baseline) {
            Some(base) => base,
            None => {
                warn!("baseline has no loops, nothing to generate");
                return Vec::new();
            }
        };

        let mut candidates = vec![base.clone()];
        for &size in menu {
            if candidates.len() >= limit {
                break;
            }
            let variant = uniform_tile_variant(&base, size, label);
            if satisfies_coalescing_constraint(&variant) {
                candidates.push(variant);
            } else {
                debug!("{} with tile {} fails the coalescing predicate", label, size);
            }
        }

        for candidate in &mut candidates {
            self.annotate(candidate);
        }
        candidates
    }

    /// Every ordering of the loops crossed with the enumeration tile menu.
    ///
    /// Orders are visited in lexicographic order of `loop_names`; within an
    /// order, tile combinations advance like an odometer, last loop fastest.
    /// With `only_coalesced`, orders whose weighted score is not positive are
    /// skipped as a whole. Orders are produced lazily and output stops at the
    /// enumeration cap, so a small cap bounds the work on deep nests.
    pub fn generate_all_legal_configs<S: AsRef<str>>(
        &self,
        num_loops: usize,
        loop_names: &[S],
        only_coalesced: bool,
    ) -> Vec<ScheduleConfig> {
        if num_loops == 0 {
            return Vec::new();
        }
        let names: Vec<String> = (0..num_loops)
            .map(|d| match loop_names.get(d).map(|s| s.as_ref()) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => default_iterator_name(d),
            })
            .collect();
        if only_coalesced && self.access_patterns.is_empty() {
            warn!("no access patterns registered, every loop order scores zero");
        }
        if only_coalesced && count_retained_orders(&names, &self.access_patterns) == 0 {
            info!("no loop order of {} loop(s) coalesces any array", num_loops);
            return Vec::new();
        }

        let menu = &self.config.enumeration_tile_sizes;
        let cap = self.config.max_enumerated;
        let mut candidates = Vec::new();
        let mut pruned_orders = 0usize;

        'orders: for order in loop_orders(&names) {
            if candidates.len() >= cap {
                warn!("enumeration cap of {} configurations reached", cap);
                break;
            }
            let base = ScheduleConfig::from_loop_order(&order);
            let score = compute_weighted_coalescing_score(&base, &self.access_patterns);
            if only_coalesced && score <= 0.0 {
                pruned_orders += 1;
                continue;
            }

            let mut digits = vec![0usize; num_loops];
            loop {
                if candidates.len() >= cap {
                    warn!("enumeration cap of {} configurations reached", cap);
                    break 'orders;
                }
                let mut config = base.clone().with_description("enumerated");
                if !menu.is_empty() {
                    for (name, &digit) in names.iter().zip(&digits) {
                        config.set_tile_size(name, menu[digit]);
                    }
                }
                self.annotate(&mut config);
                candidates.push(config);
                if !advance_odometer(&mut digits, menu.len()) {
                    break;
                }
            }
        }

        info!(
            "enumerated {} configuration(s) over {} loop(s), {} order(s) pruned",
            candidates.len(),
            num_loops,
            pruned_orders
        );
        candidates
    }
}

fn uniform_tile_variant(base: &ScheduleConfig, size: i64, label: &str) -> ScheduleConfig {
    let mut variant = base.clone().with_description(format!("{} tile {}", label, size));
    for name in base.loop_order() {
        variant.set_tile_size(name, size);
    }
    variant
}

/// Step to the next digit combination; `false` once every digit wrapped.
fn advance_odometer(digits: &mut [usize], radix: usize) -> bool {
    for digit in digits.iter_mut().rev() {
        *digit += 1;
        if *digit < radix {
            return true;
        }
        *digit = 0;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AccessPattern, BaselineStmt, TransformMatrix};
    use crate::solver::SolverConfig;

    fn gemm_patterns() -> Vec<AccessPattern> {
        vec![
            AccessPattern::read_only("A", &["i", "k"]),
            AccessPattern::read_only("B", &["k", "j"]),
            AccessPattern::read_write("C", &["i", "j"]),
        ]
    }

    fn gemm_solver(config: SolverConfig) -> ConstraintSolver {
        let mut solver = ConstraintSolver::new(config);
        solver.set_access_patterns(gemm_patterns());
        solver
    }

    #[test]
    fn test_neighbors() {
        let solver = gemm_solver(SolverConfig::default());
        let baseline = BaselineSchedule::single(&["i", "j", "k"]);

        let candidates = solver.generate_candidates_from_optimal(&baseline, 3);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].loop_order(), vec!["i", "j", "k"]);
        assert!(candidates[0].tile_sizes.is_empty());
        assert_eq!(candidates[1].tile_size("j"), Some(16));
        assert_eq!(candidates[2].tile_size("k"), Some(32));
        assert!(candidates.iter().all(|c| c.weighted_coalescing_score == 4096.0));

        // Menu exhausted before k.
        assert_eq!(solver.generate_candidates_from_optimal(&baseline, 20).len(), 6);
    }

    #[test]
    fn test_empty_inputs() {
        let solver = gemm_solver(SolverConfig::default());
        let baseline = BaselineSchedule::single(&["i", "j"]);
        assert!(solver.generate_candidates_from_optimal(&baseline, 0).is_empty());
        assert!(solver
            .generate_candidates_from_optimal(&BaselineSchedule::default(), 4)
            .is_empty());
        assert!(solver
            .generate_by_constraint_sampling(&BaselineSchedule::default(), 4)
            .is_empty());
        assert!(solver.generate_all_legal_configs::<&str>(0, &[], false).is_empty());
    }

    #[test]
    fn test_baseline_follows_matrix_hint() {
        let solver = gemm_solver(SolverConfig::default());
        let stmt = BaselineStmt::new(&["i", "j", "k"]).with_matrix(TransformMatrix::new(vec![
            vec![1, 0, 0],
            vec![0, 0, 1],
            vec![0, 1, 0],
        ]));
        let baseline = BaselineSchedule::new(vec![stmt]);
        let config = solver.baseline_config(&baseline).unwrap();
        assert_eq!(config.loop_order(), vec!["i", "k", "j"]);
        assert_eq!(config.description, "baseline");
    }

    #[test]
    fn test_sampling() {
        let solver = gemm_solver(SolverConfig::default());
        let baseline = BaselineSchedule::single(&["i", "j"]);
        let samples = solver.generate_by_constraint_sampling(&baseline, 5);
        assert_eq!(samples.len(), 5);
        let sizes: Vec<_> = samples[1..].iter().map(|c| c.tile_size("i").unwrap()).collect();
        assert_eq!(sizes, vec![16, 32, 64, 128]);
    }

    #[test]
    fn test_full_enumeration() {
        let solver = gemm_solver(SolverConfig::default());
        let all = solver.generate_all_legal_configs(3, &["i", "j", "k"], false);
        assert_eq!(all.len(), 6 * 125);
        assert_eq!(all[0].loop_order(), vec!["i", "j", "k"]);
        assert_eq!(all[0].tile_values().collect::<Vec<_>>(), vec![16, 16, 16]);
        assert_eq!(all[1].tile_values().collect::<Vec<_>>(), vec![16, 16, 32]);
        assert_eq!(all[125].loop_order(), vec!["i", "k", "j"]);

        let coalesced = solver.generate_all_legal_configs(3, &["i", "j", "k"], true);
        assert_eq!(coalesced.len(), 4 * 125);
        assert!(coalesced.iter().all(|c| c.weighted_coalescing_score > 0.0));
    }

    #[test]
    fn test_enumeration_cap_and_default_names() {
        let solver = gemm_solver(SolverConfig::default().max_enumerated(10));
        let all = solver.generate_all_legal_configs::<&str>(2, &[], false);
        assert_eq!(all.len(), 10);
        assert_eq!(all[0].loop_order(), vec!["i", "j"]);
    }

    #[test]
    fn test_cap_bounds_deep_nests() {
        let names: Vec<String> = (0..12).map(|d| format!("l{}", d)).collect();
        let config = SolverConfig::default()
            .enumeration_tiles(vec![32])
            .max_enumerated(10);
        let solver = ConstraintSolver::new(config);

        let all = solver.generate_all_legal_configs(12, &names, false);
        assert_eq!(all.len(), 10);
        assert_eq!(all[0].loop_order(), names.iter().map(|s| s.as_str()).collect::<Vec<_>>());
        assert_eq!(all[1].innermost_loop(), Some("l10"));

        // Nothing scores without patterns, so no order is visited at all.
        assert!(solver.generate_all_legal_configs(12, &names, true).is_empty());
    }

    #[test]
    fn test_only_coalesced_without_patterns() {
        let solver = ConstraintSolver::new(SolverConfig::default());
        assert!(solver.generate_all_legal_configs(2, &["i", "j"], true).is_empty());
        assert_eq!(solver.generate_all_legal_configs(2, &["i", "j"], false).len(), 50);
    }

    #[test]
    fn test_odometer() {
        let mut digits = vec![0, 1];
        assert!(advance_odometer(&mut digits, 2));
        assert_eq!(digits, vec![1, 0]);
        assert!(advance_odometer(&mut digits, 2));
        assert!(!advance_odometer(&mut digits, 2));
        assert_eq!(digits, vec![0, 0]);
    }
}
