//! Cost model: a scorer that walks a tree and accumulates a scalar,
//! generalized here to a tuple of components summed independently and
//! only collapsed to a scalar at comparison time.

use std::ops::Add;

/// Per-operator cost estimate. `rows` is cardinality, used by join reorder
/// and the cost model's join selectivity math; the remaining four
/// components feed `total()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cost {
    pub rows: f64,
    pub cpu: f64,
    pub io: f64,
    pub network: f64,
    pub memory: f64,
}

/// Weights for `Cost::total`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostWeights {
    pub cpu: f64,
    pub io: f64,
    pub network: f64,
    pub memory: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            cpu: 1.0,
            io: 10.0,
            network: 100.0,
            memory: 0.1,
        }
    }
}

impl Cost {
    /// Cost from CPU/IO/network components only; `rows` and `memory`
    /// default to zero. Matches the 3-argument shape the planner uses when
    /// comparing candidate stages before a cardinality estimate is known.
    pub fn new(cpu: f64, io: f64, network: f64) -> Self {
        Self {
            rows: 0.0,
            cpu,
            io,
            network,
            memory: 0.0,
        }
    }

    pub fn from_components(rows: f64, cpu: f64, io: f64, network: f64, memory: f64) -> Self {
        Self { rows, cpu, io, network, memory }
    }

    /// All components zero.
    pub fn zero() -> Self {
        Self::from_components(0.0, 0.0, 0.0, 0.0, 0.0)
    }

    /// Sentinel that propagates under `+`; used to prune plans that cannot
    /// be built (e.g. a cross-source push that the feature detector rejects).
    pub fn infinite() -> Self {
        Self::from_components(
            f64::INFINITY,
            f64::INFINITY,
            f64::INFINITY,
            f64::INFINITY,
            f64::INFINITY,
        )
    }

    /// A finite but deliberately dominating cost, used to rank a candidate
    /// last without poisoning every sum that touches it (unlike `infinite`).
    pub fn huge() -> Self {
        Self::from_components(1.0e12, 1.0e12, 1.0e12, 1.0e12, 1.0e12)
    }

    pub fn is_infinite(&self) -> bool {
        self.cpu.is_infinite() || self.io.is_infinite() || self.network.is_infinite() || self.memory.is_infinite()
    }

    /// Weighted scalar used for plan comparison.
    pub fn total(&self) -> f64 {
        self.total_with(&CostWeights::default())
    }

    pub fn total_with(&self, weights: &CostWeights) -> f64 {
        self.cpu * weights.cpu + self.io * weights.io + self.network * weights.network + self.memory * weights.memory
    }

    /// Cost of scanning `estimated_rows` rows at a data source, proportional
    /// to the source-reported row count.
    pub fn for_scan(estimated_rows: f64) -> Self {
        Self::from_components(estimated_rows, estimated_rows, estimated_rows, 0.0, 0.0)
    }

    /// Cost of joining two inputs of the given estimated cardinalities,
    /// applying the equi-join (0.1) or non-equi (0.3) selectivity factor
    /// to estimate the output row count.
    pub fn for_join(left_rows: f64, right_rows: f64, equi: bool) -> Self {
        let selectivity = if equi { 0.1 } else { 0.3 };
        let output_rows = left_rows * right_rows * selectivity;
        Self::from_components(output_rows, left_rows * right_rows, 0.0, 0.0, output_rows)
    }

    /// Cost of moving `bytes_estimate` between sources, proportional to
    /// bytes moved.
    pub fn for_network_transfer(bytes_estimate: f64) -> Self {
        Self::from_components(0.0, 0.0, 0.0, bytes_estimate, 0.0)
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, other: Cost) -> Cost {
        if self.is_infinite() || other.is_infinite() {
            return Cost::infinite();
        }
        Cost {
            rows: self.rows + other.rows,
            cpu: self.cpu + other.cpu,
            io: self.io + other.io,
            network: self.network + other.network,
            memory: self.memory + other.memory,
        }
    }
}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.total().partial_cmp(&other.total())
    }
}

/// CBO join-order search: enumerates every ordering of
/// `relation_rows` (estimated cardinality per relation, base first) and
/// returns the indices in minimum-weighted-total-cost order. Above
/// `branching_limit` relations the search space is not enumerated at all —
/// the identity order is returned and the caller keeps whatever order the
/// heuristic reorder rule already produced, so CBO can be toggled behind
/// the same feature flag as a pure refinement over RBO-only plans.
pub fn enumerate_join_order(relation_rows: &[f64], branching_limit: usize) -> Vec<usize> {
    let n = relation_rows.len();
    if n <= 1 || n > branching_limit {
        return (0..n).collect();
    }
    let mut indices: Vec<usize> = (0..n).collect();
    let mut best_order = indices.clone();
    let mut best_cost = f64::INFINITY;
    permute(&mut indices, 0, relation_rows, &mut best_order, &mut best_cost);
    best_order
}

fn permute(indices: &mut [usize], k: usize, relation_rows: &[f64], best_order: &mut Vec<usize>, best_cost: &mut f64) {
    if k == indices.len() {
        let cost = sequence_cost(indices, relation_rows);
        if cost < *best_cost {
            *best_cost = cost;
            best_order.clear();
            best_order.extend_from_slice(indices);
        }
        return;
    }
    for i in k..indices.len() {
        indices.swap(k, i);
        permute(indices, k + 1, relation_rows, best_order, best_cost);
        indices.swap(k, i);
    }
}

/// Left-deep plan cost for a fixed join order: each step scans the next
/// relation and joins it to the running intermediate, assuming an equi-join
/// selectivity (the 0.1 factor) since the order search has no access to
/// each join's actual predicate shape.
fn sequence_cost(order: &[usize], relation_rows: &[f64]) -> f64 {
    let mut rows = relation_rows[order[0]];
    let mut total = Cost::for_scan(rows);
    for &idx in &order[1..] {
        let right_rows = relation_rows[idx];
        total = total + Cost::for_scan(right_rows) + Cost::for_join(rows, right_rows, true);
        rows = (rows * right_rows * 0.1).max(1.0);
    }
    total.total()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_comparison_orders_by_weighted_total() {
        assert!(Cost::new(100.0, 10.0, 5.0) < Cost::new(200.0, 20.0, 10.0));
    }

    #[test]
    fn join_order_enumeration_prefers_smallest_relation_first() {
        let order = enumerate_join_order(&[1000.0, 10.0, 100.0], 8);
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn join_order_enumeration_falls_back_above_branching_limit() {
        let rows = vec![5.0, 4.0, 3.0, 2.0];
        let order = enumerate_join_order(&rows, 2);
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn zero_cost_is_additive_identity() {
        assert_eq!(Cost::zero() + Cost::zero(), Cost::zero());
    }

    #[test]
    fn infinite_cost_propagates_under_addition() {
        let sum = Cost::infinite() + Cost::new(1.0, 1.0, 1.0);
        assert!(sum.is_infinite());
    }

    #[test]
    fn huge_cost_does_not_propagate_like_infinite() {
        let sum = Cost::huge() + Cost::new(1.0, 1.0, 1.0);
        assert!(!sum.is_infinite());
    }

    #[test]
    fn equi_join_selectivity_is_lower_than_non_equi() {
        let equi = Cost::for_join(100.0, 100.0, true);
        let non_equi = Cost::for_join(100.0, 100.0, false);
        assert!(equi.rows < non_equi.rows);
    }

    #[test]
    fn default_weights_favor_network_over_io_over_cpu() {
        let weights = CostWeights::default();
        assert_eq!(weights.cpu, 1.0);
        assert_eq!(weights.io, 10.0);
        assert_eq!(weights.network, 100.0);
        assert_eq!(weights.memory, 0.1);
    }
}
