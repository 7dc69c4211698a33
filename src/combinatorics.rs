//! Enumeration of conic integer combinations: all ways to reach a target
//! bidegree as a non-negative integer combination of generator bidegrees.
//!
//! This is the combinatorial core of the engine. It enumerates monomial bases
//! (columns = generator bidegrees), relation multiples (columns = generators
//! plus the relation's bidegree), and multiplicative extensions of a
//! differential (columns = bidegrees of known elements).

use crate::bidegree::Bidegree;
use crate::{Error, Result};

/// Find every non-negative integer vector `x` with `Σ xᵢ·colᵢ = target`.
///
/// The grading component (`y`) of every column must be non-negative, and a
/// column with zero grading component must have positive `x` — otherwise the
/// solution set can be infinite and the input is rejected as ill-posed. An
/// empty result is a normal outcome; an error is not.
///
/// The result is duplicate-free and in a deterministic (odometer) order.
pub fn convex_integral_combinations(
    columns: &[Bidegree],
    target: Bidegree,
) -> Result<Vec<Vec<u32>>> {
    let n = columns.len();
    if n == 0 {
        return Ok(if target == Bidegree::zero() {
            vec![vec![]]
        } else {
            vec![]
        });
    }

    for col in columns {
        if col.y() < 0 {
            return Err(Error::IllPosed(format!(
                "generator bidegree {col} has negative grading component"
            )));
        }
        if col.y() == 0 && col.x() <= 0 {
            return Err(Error::IllPosed(format!(
                "generator bidegree {col} has zero grading component but non-positive degree"
            )));
        }
    }
    if target.y() < 0 {
        return Ok(vec![]);
    }

    let bx = |j: usize| columns[j].x() as i64;
    let by = |j: usize| columns[j].y() as i64;
    let (tx, ty) = (target.x() as i64, target.y() as i64);

    // A single column: divide and check.
    if n == 1 {
        let factor = if by(0) > 0 { ty / by(0) } else { tx / bx(0) };
        if factor >= 0 && columns[0].scale(factor as i32) == target {
            return Ok(vec![vec![factor as u32]]);
        }
        return Ok(vec![]);
    }

    // Two independent columns to pivot on, if the rank is at least 2.
    let pivot = (1..n).find(|&j| bx(0) * by(j) - bx(j) * by(0) != 0);

    let Some(p1) = pivot else {
        // All columns parallel: bounded brute force over every coefficient.
        let bounds: Vec<i64> = if by(0) > 0 {
            (0..n).map(|j| ty / by(j)).collect()
        } else {
            // Every column is (x, 0) with x > 0.
            if ty != 0 || tx < 0 {
                return Ok(vec![]);
            }
            if tx == 0 {
                return Ok(vec![vec![0; n]]);
            }
            (0..n).map(|j| tx / bx(j)).collect()
        };
        let mut config = vec![0u32; n];
        let mut res = Vec::new();
        loop {
            let (sx, sy) = weighted_sum(columns, &config);
            if sx == tx && sy == ty {
                res.push(config.clone());
            }
            if !next_config(&mut config, &bounds) {
                return Ok(res);
            }
        }
    };
    let p0 = 0;

    // Solve the 2x2 pivot subsystem by the adjugate: integrality and sign are
    // checked against the determinant.
    let det = bx(p0) * by(p1) - bx(p1) * by(p0);
    let check = |rx: i64, ry: i64| -> Option<(u32, u32)> {
        let s0 = by(p1) * rx - bx(p1) * ry;
        let s1 = -by(p0) * rx + bx(p0) * ry;
        if s0 * det < 0 || s0 % det != 0 || s1 * det < 0 || s1 % det != 0 {
            return None;
        }
        Some(((s0 / det) as u32, (s1 / det) as u32))
    };

    if n == 2 {
        return Ok(check(tx, ty).map(|(c0, c1)| vec![c0, c1]).into_iter().collect());
    }

    // Coefficient bounds from the non-negativity of the grading data. The
    // x-derived bound is only valid when no column can contribute negatively
    // to x and the target's x is non-negative.
    let tighten_by_x = tx >= 0 && (0..n).all(|j| bx(j) >= 0);
    let mut bounds = vec![0i64; n];
    let mut skipped = Vec::new();
    for j in 0..n {
        if by(j) > 0 {
            bounds[j] = ty / by(j);
            if tighten_by_x && bx(j) > 0 && tx / bx(j) < bounds[j] {
                bounds[j] = tx / bx(j);
            }
        } else {
            skipped.push(j);
        }
    }
    if !skipped.is_empty() {
        // Columns with zero grading component are capped by what is left of
        // the x target after the most negative contribution of the others.
        let mut cap = tx;
        for j in 0..n {
            if !skipped.contains(&j) && bx(j) < 0 {
                cap -= bx(j) * bounds[j];
            }
        }
        for &j in &skipped {
            bounds[j] = cap / bx(j);
            if bounds[j] < 0 {
                return Ok(vec![]);
            }
        }
    }

    let free: Vec<usize> = (0..n).filter(|&j| j != p0 && j != p1).collect();
    let free_bounds: Vec<i64> = free.iter().map(|&j| bounds[j]).collect();
    let mut config = vec![0u32; free.len()];
    let mut res = Vec::new();
    loop {
        let (mut rx, mut ry) = (tx, ty);
        for (k, &j) in free.iter().enumerate() {
            rx -= bx(j) * config[k] as i64;
            ry -= by(j) * config[k] as i64;
        }
        if let Some((c0, c1)) = check(rx, ry) {
            let mut full = vec![0u32; n];
            full[p0] = c0;
            full[p1] = c1;
            for (k, &j) in free.iter().enumerate() {
                full[j] = config[k];
            }
            res.push(full);
        }
        if !next_config(&mut config, &free_bounds) {
            return Ok(res);
        }
    }
}

fn weighted_sum(columns: &[Bidegree], config: &[u32]) -> (i64, i64) {
    let mut sx = 0i64;
    let mut sy = 0i64;
    for (j, &c) in config.iter().enumerate() {
        sx += columns[j].x() as i64 * c as i64;
        sy += columns[j].y() as i64 * c as i64;
    }
    (sx, sy)
}

/// Advance to the lexicographically next configuration within `bounds`.
/// Returns `false` once every coefficient sits at its bound.
fn next_config(config: &mut [u32], bounds: &[i64]) -> bool {
    for i in (0..config.len()).rev() {
        if (config[i] as i64) < bounds[i] {
            config[i] += 1;
            for c in &mut config[i + 1..] {
                *c = 0;
            }
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(columns: &[Bidegree], target: Bidegree, max: u32) -> Vec<Vec<u32>> {
        let n = columns.len();
        let mut res = Vec::new();
        let mut config = vec![0u32; n];
        let bounds = vec![max as i64; n];
        loop {
            let (sx, sy) = weighted_sum(columns, &config);
            if sx == target.x() as i64 && sy == target.y() as i64 {
                res.push(config.clone());
            }
            if !next_config(&mut config, &bounds) {
                return res;
            }
        }
    }

    #[test]
    fn test_two_pivots() {
        let columns = [Bidegree::new(1, 2), Bidegree::new(3, 4)];
        let target = Bidegree::new(7, 10);
        let res = convex_integral_combinations(&columns, target).unwrap();
        assert_eq!(res, vec![vec![1, 2]]);
        assert_eq!(res, brute_force(&columns, target, 12));
    }

    #[test]
    fn test_exhaustive_cross_check() {
        let columns = [
            Bidegree::new(7, 1),
            Bidegree::new(3, 0),
            Bidegree::new(0, 2),
        ];
        for (x, y) in [(7, 3), (10, 2), (6, 0), (13, 1), (0, 0), (1, 1)] {
            let target = Bidegree::new(x, y);
            let mut res = convex_integral_combinations(&columns, target).unwrap();
            let mut expected = brute_force(&columns, target, 15);
            res.sort();
            expected.sort();
            assert_eq!(res, expected, "mismatch at target ({x}, {y})");
        }
    }

    #[test]
    fn test_negative_x_column() {
        // The negative-x column compensates for coefficients above the
        // naive x-derived bound.
        let columns = [
            Bidegree::new(2, 1),
            Bidegree::new(-1, 1),
            Bidegree::new(1, 1),
        ];
        let target = Bidegree::new(1, 3);
        let res = convex_integral_combinations(&columns, target).unwrap();
        assert_eq!(res, vec![vec![0, 1, 2]]);
        assert_eq!(res, brute_force(&columns, target, 5));
    }

    #[test]
    fn test_single_column() {
        let columns = [Bidegree::new(0, 2)];
        assert_eq!(
            convex_integral_combinations(&columns, Bidegree::new(0, 6)).unwrap(),
            vec![vec![3]]
        );
        assert!(
            convex_integral_combinations(&columns, Bidegree::new(1, 6))
                .unwrap()
                .is_empty()
        );
        assert!(
            convex_integral_combinations(&columns, Bidegree::new(0, 5))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_parallel_columns() {
        let columns = [Bidegree::new(1, 1), Bidegree::new(2, 2)];
        let res = convex_integral_combinations(&columns, Bidegree::new(4, 4)).unwrap();
        assert_eq!(res, vec![vec![0, 2], vec![2, 1], vec![4, 0]]);
    }

    #[test]
    fn test_zero_target() {
        let columns = [Bidegree::new(3, 0), Bidegree::new(0, 2)];
        assert_eq!(
            convex_integral_combinations(&columns, Bidegree::zero()).unwrap(),
            vec![vec![0, 0]]
        );
    }

    #[test]
    fn test_negative_grading_target_is_empty() {
        let columns = [Bidegree::new(3, 0), Bidegree::new(0, 2)];
        assert!(
            convex_integral_combinations(&columns, Bidegree::new(3, -2))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_ill_posed_columns() {
        for bad in [Bidegree::zero(), Bidegree::new(-1, 0), Bidegree::new(2, -1)] {
            let columns = [bad, Bidegree::new(0, 2)];
            assert!(matches!(
                convex_integral_combinations(&columns, Bidegree::new(0, 2)),
                Err(Error::IllPosed(_))
            ));
        }
    }
}
