//! CART regression tree
//!
//! Grown on a (possibly repeated) subset of training rows using the
//! squared-error criterion. Tracks the total impurity decrease per feature
//! for importance reporting.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Improvements below this are treated as no improvement
const MIN_IMPURITY_DECREASE: f64 = 1e-12;

/// Stopping rules applied while growing a tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    children_sse: f64,
}

/// A fitted regression tree
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    impurity_decrease: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree over the rows listed in `samples`
    pub fn fit<'a>(
        x: ArrayView2<'a, f64>,
        y: ArrayView1<'a, f64>,
        samples: Vec<usize>,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            impurity_decrease: vec![0.0; x.ncols()],
        };
        let grower = Grower { x, y, params };
        grower.grow(&mut tree, samples, 0, rng);
        tree
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Impurity decrease per feature, normalized to sum to 1.
    /// All zeros when the tree never split.
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.impurity_decrease.len()];
        }
        self.impurity_decrease.iter().map(|d| d / total).collect()
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

struct Grower<'a> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    params: TreeParams,
}

impl Grower<'_> {
    fn grow(&self, tree: &mut RegressionTree, samples: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let (mean, sse) = self.node_stats(&samples);
        let id = tree.nodes.len();
        tree.nodes.push(Node::Leaf { value: mean });

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached
            || samples.len() < self.params.min_samples_split
            || samples.len() < 2 * self.params.min_samples_leaf
            || sse <= MIN_IMPURITY_DECREASE
        {
            return id;
        }

        let split = match self.best_split(&samples, sse, rng) {
            Some(s) => s,
            None => return id,
        };
        tree.impurity_decrease[split.feature] += sse - split.children_sse;

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.x[[i, split.feature]] <= split.threshold);

        let left_id = self.grow(tree, left, depth + 1, rng);
        let right_id = self.grow(tree, right, depth + 1, rng);
        tree.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };
        id
    }

    fn node_stats(&self, samples: &[usize]) -> (f64, f64) {
        let n = samples.len() as f64;
        let sum: f64 = samples.iter().map(|&i| self.y[i]).sum();
        let mean = sum / n;
        let sse = samples.iter().map(|&i| (self.y[i] - mean).powi(2)).sum();
        (mean, sse)
    }

    /// Best squared-error split over all features, visited in random order.
    /// Among equally good splits the first one visited wins.
    fn best_split(&self, samples: &[usize], node_sse: f64, rng: &mut StdRng) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(rng);

        let min_leaf = self.params.min_samples_leaf;
        let n = samples.len();
        let mut best: Option<SplitCandidate> = None;
        let mut sorted = samples.to_vec();

        for feature in features {
            sorted.sort_by(|&a, &b| {
                self.x[[a, feature]]
                    .partial_cmp(&self.x[[b, feature]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let total_sum: f64 = sorted.iter().map(|&i| self.y[i]).sum();
            let total_sq: f64 = sorted.iter().map(|&i| self.y[i].powi(2)).sum();
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 1..n {
                let prev = sorted[k - 1];
                left_sum += self.y[prev];
                left_sq += self.y[prev].powi(2);

                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let lo = self.x[[prev, feature]];
                let hi = self.x[[sorted[k], feature]];
                if hi <= lo {
                    continue;
                }

                let left_n = k as f64;
                let right_n = (n - k) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let children_sse = (left_sq - left_sum * left_sum / left_n).max(0.0)
                    + (right_sq - right_sum * right_sum / right_n).max(0.0);

                let improves = match &best {
                    None => node_sse - children_sse > MIN_IMPURITY_DECREASE,
                    Some(b) => children_sse < b.children_sse - MIN_IMPURITY_DECREASE,
                };
                if improves {
                    let mid = lo + (hi - lo) / 2.0;
                    let threshold = if mid >= hi { lo } else { mid };
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        children_sse,
                    });
                }
            }
        }
        best
    }
}
