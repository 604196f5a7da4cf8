use crate::common::constants::PI;

const MAX_NEWTON_ITERATIONS: usize = 100;
const NEWTON_TOLERANCE: f64 = 1.0e-15;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuadratureError {
    #[error("gauss-legendre rule requires at least 1 node, got {actual}")]
    EmptyRule { actual: usize },
    #[error("gauss-legendre node {index} of {order} did not converge after {iterations} steps")]
    NoConvergence {
        index: usize,
        order: usize,
        iterations: usize,
    },
}

/// Gauss-Legendre nodes on `[-1, 1]` sorted in descending order, with weights.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussLegendreRule {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendreRule {
    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

pub fn gauss_legendre(order: usize) -> Result<GaussLegendreRule, QuadratureError> {
    if order == 0 {
        return Err(QuadratureError::EmptyRule { actual: order });
    }

    let mut nodes = vec![0.0; order];
    let mut weights = vec![0.0; order];
    let n = order as f64;

    for index in 0..order.div_ceil(2) {
        let mut z = (PI * (index as f64 + 0.75) / (n + 0.5)).cos();
        let mut converged = false;
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let (value, derivative) = legendre_with_derivative(order, z);
            let step = value / derivative;
            z -= step;
            if step.abs() <= NEWTON_TOLERANCE {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(QuadratureError::NoConvergence {
                index,
                order,
                iterations: MAX_NEWTON_ITERATIONS,
            });
        }

        let (_, derivative) = legendre_with_derivative(order, z);
        let weight = 2.0 / ((1.0 - z * z) * derivative * derivative);
        nodes[index] = z;
        nodes[order - 1 - index] = -z;
        weights[index] = weight;
        weights[order - 1 - index] = weight;
    }

    if order % 2 == 1 {
        nodes[order / 2] = 0.0;
    }

    Ok(GaussLegendreRule { nodes, weights })
}

/// `P_n(x)` and `P_n'(x)` by the three-term recurrence.
fn legendre_with_derivative(order: usize, x: f64) -> (f64, f64) {
    let mut p_current = 1.0;
    let mut p_previous = 0.0;
    for degree in 1..=order {
        let j = degree as f64;
        let p_next = ((2.0 * j - 1.0) * x * p_current - (j - 1.0) * p_previous) / j;
        p_previous = p_current;
        p_current = p_next;
    }

    let n = order as f64;
    let derivative = n * (x * p_current - p_previous) / (x * x - 1.0);
    (p_current, derivative)
}

#[cfg(test)]
mod tests {
    use super::{QuadratureError, gauss_legendre};
    use crate::numerics::stable_weighted_sum;

    #[test]
    fn empty_rule_is_rejected() {
        assert_eq!(
            gauss_legendre(0),
            Err(QuadratureError::EmptyRule { actual: 0 })
        );
    }

    #[test]
    fn weights_sum_to_interval_length() {
        for order in [1, 2, 7, 64, 122] {
            let rule = gauss_legendre(order).expect("rule");
            let total: f64 = rule.weights().iter().sum();
            assert!((total - 2.0).abs() < 1.0e-13, "order={order} total={total}");
        }
    }

    #[test]
    fn nodes_are_descending_and_symmetric() {
        let rule = gauss_legendre(9).expect("rule");
        assert_eq!(rule.order(), 9);
        assert!(rule.nodes().windows(2).all(|pair| pair[0] > pair[1]));
        for index in 0..rule.order() {
            let mirrored = rule.nodes()[rule.order() - 1 - index];
            assert!((rule.nodes()[index] + mirrored).abs() < 1.0e-15);
        }
        assert_eq!(rule.nodes()[4], 0.0);
    }

    #[test]
    fn rule_integrates_polynomials_up_to_degree_two_n_minus_one() {
        let order = 5;
        let rule = gauss_legendre(order).expect("rule");
        for power in 0..(2 * order) as i32 {
            let expected = if power % 2 == 0 {
                2.0 / (power as f64 + 1.0)
            } else {
                0.0
            };
            let values: Vec<f64> = rule.nodes().iter().map(|x| x.powi(power)).collect();
            let actual = stable_weighted_sum(&values, rule.weights()).expect("matching lengths");
            assert!(
                (actual - expected).abs() < 1.0e-13,
                "power={power} expected={expected} actual={actual}"
            );
        }
    }

    #[test]
    fn two_point_rule_matches_closed_form() {
        let rule = gauss_legendre(2).expect("rule");
        let node = 1.0 / 3.0_f64.sqrt();
        assert!((rule.nodes()[0] - node).abs() < 1.0e-15);
        assert!((rule.nodes()[1] + node).abs() < 1.0e-15);
        assert!((rule.weights()[0] - 1.0).abs() < 1.0e-14);
    }
}
