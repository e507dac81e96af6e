//! Built-in kernels.

use super::Problem;
use crate::ir::{AccessPattern, BaselineSchedule, BaselineStmt, TransformMatrix};

/// Names accepted by [`builtin`].
pub const BUILTIN_NAMES: [&str; 3] = ["gemm", "gemm_bt", "jacobi2d"];

/// Matrix extent used by the built-in kernels.
pub const DEFAULT_EXTENT: i64 = 1024;

/// Look up a built-in kernel by name.
pub fn builtin(name: &str) -> Option<Problem> {
    match name {
        "gemm" => Some(gemm(DEFAULT_EXTENT)),
        "gemm_bt" => Some(gemm_transposed_b(DEFAULT_EXTENT)),
        "jacobi2d" => Some(jacobi2d(DEFAULT_EXTENT)),
        _ => None,
    }
}

fn identity(dim: usize) -> TransformMatrix {
    TransformMatrix::new(
        (0..dim)
            .map(|r| (0..dim).map(|c| i64::from(r == c)).collect())
            .collect(),
    )
}

fn gemm_baseline() -> BaselineSchedule {
    let stmt = BaselineStmt::new(&["i", "j", "k"])
        .with_matrix(identity(3))
        .with_text("C[i][j] += A[i][k] * B[k][j]");
    BaselineSchedule {
        statements: vec![stmt],
        num_params: 3,
    }
}

/// `C[i][j] += A[i][k] * B[k][j]`: no loop order coalesces all three arrays.
pub fn gemm(n: i64) -> Problem {
    Problem {
        name: "gemm".to_string(),
        baseline: gemm_baseline(),
        access_patterns: vec![
            AccessPattern::read_only("A", &["i", "k"]).dimension_size(n),
            AccessPattern::read_only("B", &["k", "j"]).dimension_size(n),
            AccessPattern::read_write("C", &["i", "j"]).dimension_size(n),
        ],
    }
}

/// GEMM with `B` stored transposed, `C[i][j] += A[i][k] * B[j][k]`.
pub fn gemm_transposed_b(n: i64) -> Problem {
    Problem {
        name: "gemm_bt".to_string(),
        access_patterns: vec![
            AccessPattern::read_only("A", &["i", "k"]).dimension_size(n),
            AccessPattern::read_only("B", &["j", "k"]).dimension_size(n),
            AccessPattern::read_write("C", &["i", "j"]).dimension_size(n),
        ],
        ..gemm(n)
    }
}

/// Five-point Jacobi step, `B[i][j] = avg(A[i±1][j], A[i][j±1], A[i][j])`.
pub fn jacobi2d(n: i64) -> Problem {
    let stmt = BaselineStmt::new(&["i", "j"])
        .with_matrix(identity(2))
        .with_text("B[i][j] = 0.2 * (A[i][j] + A[i-1][j] + A[i+1][j] + A[i][j-1] + A[i][j+1])");
    Problem {
        name: "jacobi2d".to_string(),
        baseline: BaselineSchedule {
            statements: vec![stmt],
            num_params: 1,
        },
        access_patterns: vec![
            AccessPattern::read_only("A", &["i", "j"]).frequency(5).dimension_size(n),
            AccessPattern::new("B", &["i", "j"]).write(true).dimension_size(n),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_names_resolve() {
        for name in BUILTIN_NAMES {
            let problem = builtin(name).unwrap();
            assert_eq!(problem.name, name);
            assert!(problem.validate().is_ok());
        }
        assert!(builtin("conv").is_none());
    }

    #[test]
    fn test_gemm_shape() {
        let problem = gemm(512);
        assert_eq!(problem.baseline.iterator_names(), vec!["i", "j", "k"]);
        assert!(problem.baseline.primary().unwrap().innermost_coalesced());
        assert!(problem.access_patterns.iter().all(|p| p.dimension_size == 512));
    }

    #[test]
    fn test_transposed_b_keeps_baseline() {
        let problem = gemm_transposed_b(DEFAULT_EXTENT);
        assert_eq!(problem.baseline, gemm(DEFAULT_EXTENT).baseline);
        assert_eq!(problem.access_patterns[1].fastest_index(), Some("k"));
    }
}
