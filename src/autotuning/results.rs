//! Optimization results and reporting

use super::Strategy;
use crate::analysis::SpaceReduction;
use crate::ir::ScheduleConfig;
use crate::utils::pretty::{yes_no, ReportWriter};
use serde::Serialize;
use std::fmt;

/// Outcome of one optimizer run.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    /// Strategy that produced the candidates
    pub strategy: Strategy,
    /// Cheapest successful candidate, or the failure sentinel
    pub best_config: ScheduleConfig,
    /// Successful candidate with the highest weighted coalescing score
    pub best_scoring_config: Option<ScheduleConfig>,
    /// Evaluated candidates in generation order, then rejected ones
    pub all_candidates: Vec<ScheduleConfig>,
    /// Candidates produced by the generator
    pub num_generated: usize,
    /// Candidates passing the legality filter
    pub num_legal: usize,
    /// Legal candidates removed by a hard constraint
    pub num_constraint_filtered: usize,
    /// Candidates handed to the evaluator
    pub num_evaluated: usize,
    /// Evaluations that produced a positive time
    pub num_succeeded: usize,
    /// Wall-clock duration of the run
    pub total_search_time_ms: f64,
    /// Time of `best_config`, `-1` without a success
    pub best_time_ms: f64,
    /// Slowest successful time, 0 without a success
    pub worst_time_ms: f64,
    /// Mean over successful evaluations only, 0 without a success
    pub average_time_ms: f64,
    /// Space accounting of the full enumeration
    pub search_space: Option<SpaceReduction>,
}

impl OptimizationResult {
    /// Result of a run that had nothing to work on.
    pub fn empty(strategy: Strategy) -> Self {
        let best_config = ScheduleConfig::failed();
        Self {
            strategy,
            best_time_ms: best_config.execution_time_ms,
            best_config,
            best_scoring_config: None,
            all_candidates: Vec::new(),
            num_generated: 0,
            num_legal: 0,
            num_constraint_filtered: 0,
            num_evaluated: 0,
            num_succeeded: 0,
            total_search_time_ms: 0.0,
            worst_time_ms: 0.0,
            average_time_ms: 0.0,
            search_space: None,
        }
    }

    /// Whether any candidate was evaluated successfully.
    pub fn succeeded(&self) -> bool {
        self.best_config.is_valid && self.best_time_ms > 0.0
    }

    /// Successful candidates sorted by time.
    pub fn ranked(&self) -> Vec<&ScheduleConfig> {
        let mut ranked: Vec<_> = self
            .all_candidates
            .iter()
            .filter(|c| c.is_valid && c.is_evaluated())
            .collect();
        ranked.sort_by(|a, b| a.execution_time_ms.total_cmp(&b.execution_time_ms));
        ranked
    }

    /// Export all candidates to CSV format
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        csv.push_str(
            "description,loop_order,tiles,time_ms,valid,coalescing_violation,bank_conflict_way,weighted_score\n",
        );
        for c in &self.all_candidates {
            let tiles = c
                .tile_sizes
                .iter()
                .map(|ts| format!("{}={}", ts.loop_name, ts.size))
                .collect::<Vec<_>>()
                .join(";");
            csv.push_str(&format!(
                "{},{},{},{:.6},{},{},{},{:.1}\n",
                c.description.replace(',', " "),
                c.loop_order().join(">"),
                tiles,
                c.execution_time_ms,
                c.is_valid,
                c.has_coalescing_violation,
                c.bank_conflict_way,
                c.weighted_coalescing_score
            ));
        }
        csv
    }

    /// Human-readable report
    pub fn summary(&self) -> String {
        let mut w = ReportWriter::default_indent();
        w.section(&format!("Optimization result ({})", self.strategy));
        w.field("Generated", 20, self.num_generated);
        w.field("Legal", 20, self.num_legal);
        w.field("Constraint-filtered", 20, self.num_constraint_filtered);
        w.field("Evaluated", 20, self.num_evaluated);
        w.field("Succeeded", 20, self.num_succeeded);
        w.field("Search time", 20, format!("{:.3} ms", self.total_search_time_ms));
        if let Some(space) = &self.search_space {
            w.field(
                "Search space",
                20,
                format!(
                    "{} -> {} ({:.1}% pruned)",
                    space.original.total,
                    space.retained_configs,
                    space.reduction_percent()
                ),
            );
        }
        w.writeln("");

        if !self.succeeded() {
            w.writeln("No successful configuration");
            return w.finish();
        }

        w.field("Best", 20, self.best_config.describe());
        w.field("Best time", 20, format!("{:.3} ms", self.best_time_ms));
        w.field("Worst time", 20, format!("{:.3} ms", self.worst_time_ms));
        w.field("Average time", 20, format!("{:.3} ms", self.average_time_ms));
        w.field(
            "Bank conflict",
            20,
            format!(
                "{} ({}-way)",
                yes_no(self.best_config.has_bank_conflict),
                self.best_config.bank_conflict_way
            ),
        );
        if let Some(scoring) = &self.best_scoring_config {
            w.field(
                "Best coalescing",
                20,
                format!("{} (score {:.0})", scoring.describe(), scoring.weighted_coalescing_score),
            );
        }
        w.writeln("");

        w.block("Top 5 configurations:", |w| {
            w.writeln(&format!("{:<48} {:>10} {:>8}", "Config", "Time", "Speedup"));
            w.writeln(&"-".repeat(68));
            let ranked = self.ranked();
            let slowest = ranked.last().map_or(1.0, |c| c.execution_time_ms);
            for c in ranked.iter().take(5) {
                w.writeln(&format!(
                    "{:<48} {:>7.3} ms {:>7.2}x",
                    c.describe(),
                    c.execution_time_ms,
                    slowest / c.execution_time_ms
                ));
            }
        });
        w.finish()
    }
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
