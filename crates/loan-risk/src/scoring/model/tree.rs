use super::BoostingParams;

#[derive(Debug, Clone, PartialEq)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// One boosting round: a regression tree over encoded features whose leaves hold
/// already-shrunk margin contributions.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Grow a tree against the current gradients and hessians. Split gains are added to
    /// `feature_gain` per feature.
    pub(crate) fn grow(
        rows: &[&[f64]],
        gradients: &[f64],
        hessians: &[f64],
        params: &BoostingParams,
        feature_gain: &mut [f64],
    ) -> Self {
        let mut builder = TreeBuilder {
            rows,
            gradients,
            hessians,
            params,
            feature_gain,
            nodes: Vec::new(),
        };
        builder.build((0..rows.len()).collect(), 0);
        Self {
            nodes: builder.nodes,
        }
    }

    pub(crate) fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }
}

struct CandidateSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    rows: &'a [&'a [f64]],
    gradients: &'a [f64],
    hessians: &'a [f64],
    params: &'a BoostingParams,
    feature_gain: &'a mut [f64],
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let gradient: f64 = indices.iter().map(|&i| self.gradients[i]).sum();
        let hessian: f64 = indices.iter().map(|&i| self.hessians[i]).sum();

        if depth < self.params.max_depth {
            if let Some(split) = self.best_split(&indices, gradient, hessian) {
                let (left, right): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| self.rows[i][split.feature] < split.threshold);
                self.feature_gain[split.feature] += split.gain;

                let node = self.nodes.len();
                self.nodes.push(TreeNode::Leaf { value: 0.0 });
                let left = self.build(left, depth + 1);
                let right = self.build(right, depth + 1);
                self.nodes[node] = TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                return node;
            }
        }

        let weight = -gradient / (hessian + self.params.lambda);
        self.nodes.push(TreeNode::Leaf {
            value: weight * self.params.learning_rate,
        });
        self.nodes.len() - 1
    }

    fn score(&self, gradient: f64, hessian: f64) -> f64 {
        gradient * gradient / (hessian + self.params.lambda)
    }

    /// Exact greedy search over every feature and every boundary between distinct values.
    fn best_split(&self, indices: &[usize], gradient: f64, hessian: f64) -> Option<CandidateSplit> {
        let parent_score = self.score(gradient, hessian);
        let width = indices
            .first()
            .map(|&i| self.rows[i].len())
            .unwrap_or_default();
        let mut best: Option<CandidateSplit> = None;
        let mut sorted = indices.to_vec();

        for feature in 0..width {
            sorted.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let mut left_gradient = 0.0;
            let mut left_hessian = 0.0;
            for window in 0..sorted.len().saturating_sub(1) {
                let current = sorted[window];
                left_gradient += self.gradients[current];
                left_hessian += self.hessians[current];

                let value = self.rows[current][feature];
                let next_value = self.rows[sorted[window + 1]][feature];
                if value >= next_value {
                    continue;
                }

                let right_gradient = gradient - left_gradient;
                let right_hessian = hessian - left_hessian;
                if left_hessian < self.params.min_child_weight
                    || right_hessian < self.params.min_child_weight
                {
                    continue;
                }

                let gain = 0.5
                    * (self.score(left_gradient, left_hessian)
                        + self.score(right_gradient, right_hessian)
                        - parent_score)
                    - self.params.gamma;
                if gain <= 0.0 || best.as_ref().is_some_and(|split| gain <= split.gain) {
                    continue;
                }

                let midpoint = value + (next_value - value) / 2.0;
                best = Some(CandidateSplit {
                    feature,
                    threshold: if midpoint > value { midpoint } else { next_value },
                    gain,
                });
            }
        }

        best
    }
}
