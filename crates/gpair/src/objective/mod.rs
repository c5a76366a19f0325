//! Objective (loss) functions for gradient boosting.
//!
//! Every loss family implements [`ObjectiveFn`]: gradient/hessian
//! computation over a batch of raw predictions, the transforms between the
//! margin scale and the family's natural prediction scale, and the name of
//! its default evaluation metric. Instances are created through the
//! string-keyed [`ObjectiveRegistry`] and configured once from key-value
//! parameters before training starts.

mod cox;
mod registry;
mod regression;

pub use cox::CoxPhObjective;
pub use registry::{create_objective, ObjectiveCtor, ObjectiveRegistry};
pub use regression::{
    Gamma, GammaObjective, Logistic, LogisticObjective, LogitRaw, LogitRawObjective, Poisson,
    PoissonObjective, PointwiseLoss, PointwiseObjective, SquaredError, SquaredErrorObjective,
    Tweedie, TweedieObjective,
};

use crate::error::ObjectiveError;
use crate::vector::HostDeviceVector;

// =============================================================================
// Gradient Pairs
// =============================================================================

/// First- and second-order derivative of the loss for one example,
/// taken with respect to the raw margin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradPair {
    pub grad: f32,
    pub hess: f32,
}

impl GradPair {
    pub fn new(grad: f32, hess: f32) -> Self {
        Self { grad, hess }
    }
}

// =============================================================================
// Label/Weight Provider
// =============================================================================

/// Borrowed view of ground-truth labels and per-example weights.
///
/// Both sequences are owned by the caller and outlive the call. An empty
/// weight slice means implicit unit weights; a non-empty one must match the
/// label length.
#[derive(Debug, Clone, Copy)]
pub struct LabeledData<'a> {
    pub labels: &'a [f32],
    pub weights: &'a [f32],
}

impl<'a> LabeledData<'a> {
    pub fn new(labels: &'a [f32], weights: &'a [f32]) -> Self {
        Self { labels, weights }
    }

    /// Number of examples.
    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    /// Weight of row `i` (1.0 when the weight slice is empty).
    #[inline]
    pub fn weight(&self, i: usize) -> f32 {
        if self.weights.is_empty() {
            1.0
        } else {
            self.weights[i]
        }
    }

    /// Check prediction/label/weight length consistency.
    pub fn validate(&self, n_preds: usize) -> Result<(), ObjectiveError> {
        if self.labels.len() != n_preds {
            return Err(ObjectiveError::ShapeMismatch {
                what: "labels",
                got: self.labels.len(),
                expected: n_preds,
            });
        }
        if !self.weights.is_empty() && self.weights.len() != self.labels.len() {
            return Err(ObjectiveError::ShapeMismatch {
                what: "weights",
                got: self.weights.len(),
                expected: self.labels.len(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Objective Trait
// =============================================================================

/// A loss function driving one boosting session.
///
/// Implementations are pure with respect to their inputs: calling
/// [`get_gradient`](Self::get_gradient) twice with unchanged inputs yields
/// identical output. Label domains are checked over the whole batch before
/// any gradient is produced, so one bad label fails the call
/// deterministically.
pub trait ObjectiveFn: Send + Sync {
    /// Stable identifier, also the registry key.
    fn name(&self) -> &'static str;

    /// Parse and validate configuration parameters, applying defaults for
    /// unset ones. Keys not declared by this family are ignored so a shared
    /// global configuration block can be passed to every objective.
    fn configure(&mut self, params: &[(String, String)]) -> Result<(), ObjectiveError> {
        let _ = params;
        Ok(())
    }

    /// Compute one gradient pair per example for the current boosting
    /// round.
    ///
    /// `preds` is taken mutably only because reading it may lazily
    /// synchronize its host/device mirror; the values are not modified.
    fn get_gradient(
        &self,
        preds: &mut HostDeviceVector<f32>,
        data: LabeledData<'_>,
        iteration: u32,
    ) -> Result<HostDeviceVector<GradPair>, ObjectiveError>;

    /// In-place map from raw margins to the family's natural prediction
    /// scale (identity for squared error and the raw logistic flavor).
    fn pred_transform(&self, io_preds: &mut HostDeviceVector<f32>);

    /// In-place map applied before metric evaluation. Equal to
    /// [`pred_transform`](Self::pred_transform) for every family except
    /// `logistic-raw`, which evaluates on the probability scale while
    /// predicting raw margins.
    fn eval_transform(&self, io_preds: &mut HostDeviceVector<f32>) {
        self.pred_transform(io_preds);
    }

    /// Inverse link: margin that produces the given probability/mean.
    /// Used to seed the initial raw score.
    fn prob_to_margin(&self, base_score: f32) -> Result<f32, ObjectiveError>;

    /// Name of the evaluation metric associated with this family.
    fn default_eval_metric(&self) -> String;
}

impl std::fmt::Debug for dyn ObjectiveFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectiveFn").field("name", &self.name()).finish()
    }
}
