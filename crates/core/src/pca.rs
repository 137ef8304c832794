//! Two-component principal component analysis.
//!
//! Columns are mean-centered, the sample covariance matrix is diagonalized
//! with cyclic Jacobi rotations, and rows are projected onto the two
//! eigenvectors with the largest eigenvalues.

const MAX_SWEEPS: usize = 100;
const OFF_DIAGONAL_TOLERANCE: f64 = 1e-30;

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// One `[x, y]` per input row.
    pub points: Vec<[f64; 2]>,
    /// Unit loadings of the two components over the input columns. The
    /// largest-magnitude loading of each is positive.
    pub components: [Vec<f64>; 2],
    /// Share of total variance carried by each component.
    pub explained_variance: [f64; 2],
}

/// Rows shorter than the first row are padded with zeros. Fewer than two
/// rows (or zero columns) project every row to the origin.
pub fn project(rows: &[Vec<f64>]) -> Projection {
    let n = rows.len();
    let k = rows.first().map(Vec::len).unwrap_or(0);
    let origin = Projection {
        points: vec![[0.0, 0.0]; n],
        components: [vec![0.0; k], vec![0.0; k]],
        explained_variance: [0.0, 0.0],
    };
    if n < 2 || k == 0 {
        return origin;
    }

    let value = |row: &Vec<f64>, j: usize| row.get(j).copied().unwrap_or(0.0);
    let means: Vec<f64> = (0..k)
        .map(|j| rows.iter().map(|r| value(r, j)).sum::<f64>() / n as f64)
        .collect();
    let centered: Vec<Vec<f64>> = rows
        .iter()
        .map(|r| (0..k).map(|j| value(r, j) - means[j]).collect())
        .collect();

    let mut cov = vec![vec![0.0; k]; k];
    for row in &centered {
        for a in 0..k {
            for b in a..k {
                cov[a][b] += row[a] * row[b];
            }
        }
    }
    for a in 0..k {
        for b in a..k {
            cov[a][b] /= (n - 1) as f64;
            cov[b][a] = cov[a][b];
        }
    }

    let (eigenvalues, eigenvectors) = symmetric_eigen(cov);
    let total: f64 = eigenvalues.iter().map(|v| v.max(0.0)).sum();
    if total <= 0.0 {
        return origin;
    }

    let component = |i: usize| -> Vec<f64> {
        eigenvectors
            .get(i)
            .cloned()
            .unwrap_or_else(|| vec![0.0; k])
    };
    let components = [component(0), component(1)];
    let explained_variance = [0, 1].map(|i| {
        eigenvalues
            .get(i)
            .map(|v| v.max(0.0) / total)
            .unwrap_or(0.0)
    });
    let points = centered
        .iter()
        .map(|row| [dot(row, &components[0]), dot(row, &components[1])])
        .collect();

    Projection {
        points,
        components,
        explained_variance,
    }
}

/// Eigenvalues (descending) and matching unit eigenvectors of a symmetric
/// matrix. Each eigenvector's largest-magnitude entry is made positive.
pub fn symmetric_eigen(mut a: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut v = vec![vec![0.0; n]; n];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| (p + 1..n).map(move |q| (p, q)))
            .map(|(p, q)| a[p][q] * a[p][q])
            .sum();
        if off < OFF_DIAGONAL_TOLERANCE {
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                let apq = a[p][q];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..n {
                    let (akp, akq) = (a[k][p], a[k][q]);
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
                a[p][q] = 0.0;
                a[q][p] = 0.0;
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[j][j].total_cmp(&a[i][i]));
    let values = order.iter().map(|&i| a[i][i]).collect();
    let vectors = order
        .iter()
        .map(|&col| {
            let mut vector: Vec<f64> = v.iter().map(|row| row[col]).collect();
            let pivot = vector
                .iter()
                .copied()
                .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
            if pivot < 0.0 {
                vector.iter_mut().for_each(|x| *x = -*x);
            }
            vector
        })
        .collect();
    (values, vectors)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn eigen_of_known_matrix() {
        // [[2, 1], [1, 2]] has eigenvalues 3 and 1.
        let (values, vectors) = symmetric_eigen(vec![vec![2.0, 1.0], vec![1.0, 2.0]]);
        assert!(close(values[0], 3.0));
        assert!(close(values[1], 1.0));
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert!(close(vectors[0][0].abs(), h) && close(vectors[0][1].abs(), h));
        assert!(vectors[0][0] > 0.0 && vectors[0][1] > 0.0);
    }

    #[test]
    fn eigenvectors_are_orthonormal() {
        let m = vec![
            vec![4.0, 1.0, 0.5],
            vec![1.0, 3.0, 0.2],
            vec![0.5, 0.2, 1.0],
        ];
        let (values, vectors) = symmetric_eigen(m.clone());
        for i in 0..3 {
            assert!(close(dot(&vectors[i], &vectors[i]), 1.0));
            for j in i + 1..3 {
                assert!(dot(&vectors[i], &vectors[j]).abs() < 1e-9);
            }
            // M v = lambda v
            let mv: Vec<f64> = m.iter().map(|row| dot(row, &vectors[i])).collect();
            for (x, y) in mv.iter().zip(&vectors[i]) {
                assert!((x - values[i] * y).abs() < 1e-8);
            }
        }
        assert!(values[0] >= values[1] && values[1] >= values[2]);
    }

    #[test]
    fn points_on_a_line_have_one_component() {
        let rows = vec![
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![2.0, 2.0],
            vec![3.0, 3.0],
        ];
        let p = project(&rows);
        assert!(close(p.explained_variance[0], 1.0));
        assert!(p.explained_variance[1].abs() < 1e-9);
        let xs: Vec<f64> = p.points.iter().map(|pt| pt[0]).collect();
        assert!(xs.windows(2).all(|w| w[1] > w[0]));
        assert!(p.points.iter().all(|pt| pt[1].abs() < 1e-9));
        let sum: f64 = xs.iter().sum();
        assert!(sum.abs() < 1e-9);
    }

    #[test]
    fn degenerate_inputs_project_to_origin() {
        assert!(project(&[]).points.is_empty());
        let single = project(&[vec![0.3, 0.7]]);
        assert_eq!(single.points, vec![[0.0, 0.0]]);
        let constant = project(&[vec![0.5, 0.5], vec![0.5, 0.5]]);
        assert_eq!(constant.points, vec![[0.0, 0.0]; 2]);
        assert_eq!(constant.explained_variance, [0.0, 0.0]);
    }

    #[test]
    fn single_column_has_empty_second_component() {
        let p = project(&[vec![1.0], vec![3.0]]);
        assert!(close(p.explained_variance[0], 1.0));
        assert_eq!(p.explained_variance[1], 0.0);
        assert_eq!(p.components[1], vec![0.0]);
        assert!(close(p.points[0][0], -1.0) && close(p.points[1][0], 1.0));
    }
}
