//! Pointwise loss families.
//!
//! Every family here is a closed-form per-example formula: gradient and
//! hessian depend only on that example's margin, label and weight. The
//! formulas live in small [`PointwiseLoss`] kernel types; the generic
//! [`PointwiseObjective`] wrapper adds batch validation and routes the
//! sweep through the execution dispatcher, so each family is just its
//! arithmetic.

use std::str::FromStr;

use super::{GradPair, LabeledData, ObjectiveFn};
use crate::context::DeviceContext;
use crate::dispatch;
use crate::error::ObjectiveError;
use crate::vector::HostDeviceVector;

/// Floor keeping the logistic hessian away from zero at saturated margins.
const HESS_EPS: f32 = 1e-16;

/// Exponent clamp: margins beyond this would overflow `exp` in f32.
const MAX_EXP: f32 = 30.0;

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
fn guarded_exp(x: f32) -> f32 {
    x.clamp(-MAX_EXP, MAX_EXP).exp()
}

fn parse_param<T: FromStr>(name: &'static str, value: &str) -> Result<T, ObjectiveError> {
    value
        .trim()
        .parse()
        .map_err(|_| ObjectiveError::InvalidParameter {
            name,
            value: value.to_string(),
            reason: "not a valid number",
        })
}

// =============================================================================
// Pointwise Kernel Trait
// =============================================================================

/// Closed-form per-example loss kernel.
///
/// Weights are applied by the caller, after the hessian floor, so kernels
/// stay pure arithmetic. Parameters parsed by [`configure`](Self::configure)
/// are held in the kernel value itself and are immutable afterwards.
pub trait PointwiseLoss: Copy + Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Parse declared parameters; unrecognized keys are ignored.
    fn configure(&mut self, params: &[(String, String)]) -> Result<(), ObjectiveError> {
        let _ = params;
        Ok(())
    }

    /// Whether a label lies in this family's domain.
    fn check_label(&self, y: f32) -> bool;

    /// Human-readable domain constraint for error messages.
    fn label_constraint(&self) -> &'static str;

    /// First derivative of the loss at margin `m` for label `y`.
    fn grad(&self, m: f32, y: f32) -> f32;

    /// Second derivative, floored where the closed form can vanish.
    fn hess(&self, m: f32, y: f32) -> f32;

    /// Margin to natural prediction scale.
    fn pred_transform(&self, m: f32) -> f32;

    /// Margin to the scale metrics are evaluated on.
    fn eval_transform(&self, m: f32) -> f32 {
        self.pred_transform(m)
    }

    /// Inverse link, seeding an initial margin from a probability/mean.
    fn prob_to_margin(&self, x: f32) -> Result<f32, ObjectiveError>;

    fn default_metric(&self) -> String;
}

// =============================================================================
// Squared Error
// =============================================================================

/// Plain L2 regression.
///
/// - Gradient: `m - y`
/// - Hessian: `1`
/// - Transforms: identity
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredError;

impl PointwiseLoss for SquaredError {
    fn name(&self) -> &'static str {
        "squared-error"
    }

    fn check_label(&self, y: f32) -> bool {
        y.is_finite()
    }

    fn label_constraint(&self) -> &'static str {
        "label must be finite"
    }

    fn grad(&self, m: f32, y: f32) -> f32 {
        m - y
    }

    fn hess(&self, _m: f32, _y: f32) -> f32 {
        1.0
    }

    fn pred_transform(&self, m: f32) -> f32 {
        m
    }

    fn prob_to_margin(&self, x: f32) -> Result<f32, ObjectiveError> {
        Ok(x)
    }

    fn default_metric(&self) -> String {
        "rmse".to_string()
    }
}

// =============================================================================
// Logistic (probability output)
// =============================================================================

/// Binary log loss with predictions on the probability scale.
///
/// - Gradient: `sigmoid(m) - y`
/// - Hessian: `max(sigmoid(m) * (1 - sigmoid(m)), eps)`
/// - PredTransform: `sigmoid(m)`
#[derive(Debug, Clone, Copy, Default)]
pub struct Logistic;

impl PointwiseLoss for Logistic {
    fn name(&self) -> &'static str {
        "logistic-probability"
    }

    fn check_label(&self, y: f32) -> bool {
        (0.0..=1.0).contains(&y)
    }

    fn label_constraint(&self) -> &'static str {
        "label must be in [0, 1]"
    }

    fn grad(&self, m: f32, y: f32) -> f32 {
        sigmoid(m) - y
    }

    fn hess(&self, m: f32, _y: f32) -> f32 {
        let p = sigmoid(m);
        (p * (1.0 - p)).max(HESS_EPS)
    }

    fn pred_transform(&self, m: f32) -> f32 {
        sigmoid(m)
    }

    fn prob_to_margin(&self, x: f32) -> Result<f32, ObjectiveError> {
        if x <= 0.0 || x >= 1.0 {
            return Err(ObjectiveError::Domain {
                value: x,
                constraint: "probability must be in (0, 1)",
            });
        }
        Ok((x / (1.0 - x)).ln())
    }

    fn default_metric(&self) -> String {
        "rmse".to_string()
    }
}

// =============================================================================
// Logistic (raw margin output)
// =============================================================================

/// Binary log loss whose predictions stay on the margin scale.
///
/// Gradient and hessian match [`Logistic`]; only the output transforms
/// differ: `pred_transform` is the identity while `eval_transform` applies
/// the sigmoid so metrics still see probabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogitRaw;

impl PointwiseLoss for LogitRaw {
    fn name(&self) -> &'static str {
        "logistic-raw"
    }

    fn check_label(&self, y: f32) -> bool {
        Logistic.check_label(y)
    }

    fn label_constraint(&self) -> &'static str {
        Logistic.label_constraint()
    }

    fn grad(&self, m: f32, y: f32) -> f32 {
        Logistic.grad(m, y)
    }

    fn hess(&self, m: f32, y: f32) -> f32 {
        Logistic.hess(m, y)
    }

    fn pred_transform(&self, m: f32) -> f32 {
        m
    }

    fn eval_transform(&self, m: f32) -> f32 {
        sigmoid(m)
    }

    fn prob_to_margin(&self, x: f32) -> Result<f32, ObjectiveError> {
        Logistic.prob_to_margin(x)
    }

    fn default_metric(&self) -> String {
        "auc".to_string()
    }
}

// =============================================================================
// Poisson
// =============================================================================

/// Poisson count regression; margins live in log space.
///
/// - Gradient: `exp(m) - y`
/// - Hessian: `exp(m + max_delta_step)`
///
/// `max_delta_step` bounds the Newton step for sparse counts. It enters the
/// hessian's exponent only, never the gradient. Default 0 (uncapped).
#[derive(Debug, Clone, Copy)]
pub struct Poisson {
    pub max_delta_step: f32,
}

impl Default for Poisson {
    fn default() -> Self {
        Self {
            max_delta_step: 0.0,
        }
    }
}

impl PointwiseLoss for Poisson {
    fn name(&self) -> &'static str {
        "poisson"
    }

    fn configure(&mut self, params: &[(String, String)]) -> Result<(), ObjectiveError> {
        for (key, value) in params {
            if key == "max_delta_step" {
                let step: f32 = parse_param("max_delta_step", value)?;
                if !step.is_finite() || step < 0.0 {
                    return Err(ObjectiveError::InvalidParameter {
                        name: "max_delta_step",
                        value: value.clone(),
                        reason: "must be a finite value >= 0",
                    });
                }
                self.max_delta_step = step;
            }
        }
        Ok(())
    }

    fn check_label(&self, y: f32) -> bool {
        y >= 0.0
    }

    fn label_constraint(&self) -> &'static str {
        "label must be >= 0"
    }

    fn grad(&self, m: f32, y: f32) -> f32 {
        guarded_exp(m) - y
    }

    fn hess(&self, m: f32, _y: f32) -> f32 {
        guarded_exp(m + self.max_delta_step)
    }

    fn pred_transform(&self, m: f32) -> f32 {
        guarded_exp(m)
    }

    fn prob_to_margin(&self, x: f32) -> Result<f32, ObjectiveError> {
        log_link_margin(x)
    }

    fn default_metric(&self) -> String {
        "poisson-nloglik".to_string()
    }
}

/// Shared inverse link for the log-linked families.
fn log_link_margin(x: f32) -> Result<f32, ObjectiveError> {
    if x <= 0.0 {
        return Err(ObjectiveError::Domain {
            value: x,
            constraint: "mean must be > 0",
        });
    }
    Ok(x.ln())
}

// =============================================================================
// Gamma
// =============================================================================

/// Gamma deviance regression; margins live in log space.
///
/// - Gradient: `1 - y * exp(-m)`
/// - Hessian: `y * exp(-m)` (zero when `y` is zero; no floor, matching the
///   closed form)
#[derive(Debug, Clone, Copy, Default)]
pub struct Gamma;

impl PointwiseLoss for Gamma {
    fn name(&self) -> &'static str {
        "gamma"
    }

    fn check_label(&self, y: f32) -> bool {
        y >= 0.0
    }

    fn label_constraint(&self) -> &'static str {
        "label must be >= 0"
    }

    fn grad(&self, m: f32, y: f32) -> f32 {
        1.0 - y * guarded_exp(-m)
    }

    fn hess(&self, m: f32, y: f32) -> f32 {
        y * guarded_exp(-m)
    }

    fn pred_transform(&self, m: f32) -> f32 {
        guarded_exp(m)
    }

    fn prob_to_margin(&self, x: f32) -> Result<f32, ObjectiveError> {
        log_link_margin(x)
    }

    fn default_metric(&self) -> String {
        "gamma-nloglik".to_string()
    }
}

// =============================================================================
// Tweedie
// =============================================================================

/// Tweedie deviance regression with variance power `rho` in (1, 2);
/// margins live in log space.
///
/// - Gradient: `-y * exp((1 - rho) * m) + exp((2 - rho) * m)`
/// - Hessian: `-y * (1 - rho) * exp((1 - rho) * m)
///   + (2 - rho) * exp((2 - rho) * m)`
///
/// `rho -> 1` approaches Poisson, `rho -> 2` approaches Gamma.
#[derive(Debug, Clone, Copy)]
pub struct Tweedie {
    pub variance_power: f32,
}

impl Default for Tweedie {
    fn default() -> Self {
        Self {
            variance_power: 1.5,
        }
    }
}

impl PointwiseLoss for Tweedie {
    fn name(&self) -> &'static str {
        "tweedie"
    }

    fn configure(&mut self, params: &[(String, String)]) -> Result<(), ObjectiveError> {
        for (key, value) in params {
            if key == "tweedie_variance_power" {
                let rho: f32 = parse_param("tweedie_variance_power", value)?;
                if !(rho > 1.0 && rho < 2.0) {
                    return Err(ObjectiveError::InvalidParameter {
                        name: "tweedie_variance_power",
                        value: value.clone(),
                        reason: "must be in the open interval (1, 2)",
                    });
                }
                self.variance_power = rho;
            }
        }
        Ok(())
    }

    fn check_label(&self, y: f32) -> bool {
        y >= 0.0
    }

    fn label_constraint(&self) -> &'static str {
        "label must be >= 0"
    }

    fn grad(&self, m: f32, y: f32) -> f32 {
        let rho = self.variance_power;
        -y * guarded_exp((1.0 - rho) * m) + guarded_exp((2.0 - rho) * m)
    }

    fn hess(&self, m: f32, y: f32) -> f32 {
        let rho = self.variance_power;
        -y * (1.0 - rho) * guarded_exp((1.0 - rho) * m)
            + (2.0 - rho) * guarded_exp((2.0 - rho) * m)
    }

    fn pred_transform(&self, m: f32) -> f32 {
        guarded_exp(m)
    }

    fn prob_to_margin(&self, x: f32) -> Result<f32, ObjectiveError> {
        log_link_margin(x)
    }

    fn default_metric(&self) -> String {
        format!("tweedie-nloglik@{}", self.variance_power)
    }
}

// =============================================================================
// Generic Pointwise Objective
// =============================================================================

/// [`ObjectiveFn`] adapter for any [`PointwiseLoss`] kernel.
///
/// Validates shapes, scans every label before producing any output, then
/// hands the weighted kernel to the execution dispatcher.
#[derive(Debug, Clone)]
pub struct PointwiseObjective<L: PointwiseLoss> {
    loss: L,
    ctx: DeviceContext,
}

impl<L: PointwiseLoss + Default> PointwiseObjective<L> {
    pub fn new(ctx: &DeviceContext) -> Self {
        Self {
            loss: L::default(),
            ctx: *ctx,
        }
    }
}

impl<L: PointwiseLoss> ObjectiveFn for PointwiseObjective<L> {
    fn name(&self) -> &'static str {
        self.loss.name()
    }

    fn configure(&mut self, params: &[(String, String)]) -> Result<(), ObjectiveError> {
        self.loss.configure(params)
    }

    fn get_gradient(
        &self,
        preds: &mut HostDeviceVector<f32>,
        data: LabeledData<'_>,
        _iteration: u32,
    ) -> Result<HostDeviceVector<GradPair>, ObjectiveError> {
        data.validate(preds.len())?;
        for (row, &y) in data.labels.iter().enumerate() {
            if !self.loss.check_label(y) {
                return Err(ObjectiveError::LabelDomain {
                    objective: self.loss.name(),
                    constraint: self.loss.label_constraint(),
                    label: y,
                    row,
                });
            }
        }

        let loss = self.loss;
        Ok(dispatch::map_gradient(&self.ctx, preds, data, move |m, y, w| {
            GradPair {
                grad: w * loss.grad(m, y),
                hess: w * loss.hess(m, y),
            }
        }))
    }

    fn pred_transform(&self, io_preds: &mut HostDeviceVector<f32>) {
        let loss = self.loss;
        dispatch::transform_inplace(&self.ctx, io_preds, move |m| loss.pred_transform(m));
    }

    fn eval_transform(&self, io_preds: &mut HostDeviceVector<f32>) {
        let loss = self.loss;
        dispatch::transform_inplace(&self.ctx, io_preds, move |m| loss.eval_transform(m));
    }

    fn prob_to_margin(&self, base_score: f32) -> Result<f32, ObjectiveError> {
        self.loss.prob_to_margin(base_score)
    }

    fn default_eval_metric(&self) -> String {
        self.loss.default_metric()
    }
}

/// Squared error regression objective.
pub type SquaredErrorObjective = PointwiseObjective<SquaredError>;
/// Logistic loss with probability-scale predictions.
pub type LogisticObjective = PointwiseObjective<Logistic>;
/// Logistic loss with margin-scale predictions.
pub type LogitRawObjective = PointwiseObjective<LogitRaw>;
/// Poisson count regression objective.
pub type PoissonObjective = PointwiseObjective<Poisson>;
/// Gamma regression objective.
pub type GammaObjective = PointwiseObjective<Gamma>;
/// Tweedie regression objective.
pub type TweedieObjective = PointwiseObjective<Tweedie>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn host_obj<L: PointwiseLoss + Default>() -> PointwiseObjective<L> {
        PointwiseObjective::<L>::new(&DeviceContext::host())
    }

    fn gradient(
        obj: &dyn ObjectiveFn,
        preds: &[f32],
        labels: &[f32],
    ) -> Vec<GradPair> {
        let mut p = HostDeviceVector::from_vec(preds.to_vec());
        obj.get_gradient(&mut p, LabeledData::new(labels, &[]), 0)
            .unwrap()
            .into_host_vec()
    }

    #[test]
    fn squared_error_gradients() {
        let obj = host_obj::<SquaredError>();
        let out = gradient(&obj, &[1.0, 2.0, 3.0], &[0.5, 2.5, 2.5]);
        assert!((out[0].grad - 0.5).abs() < 1e-6);
        assert!((out[1].grad + 0.5).abs() < 1e-6);
        assert!((out[2].grad - 0.5).abs() < 1e-6);
        assert!(out.iter().all(|p| (p.hess - 1.0).abs() < 1e-6));
    }

    #[test]
    fn logistic_gradient_at_zero() {
        let obj = host_obj::<Logistic>();
        let out = gradient(&obj, &[0.0], &[1.0]);
        assert!((out[0].grad + 0.5).abs() < 1e-6);
        assert!((out[0].hess - 0.25).abs() < 1e-6);
    }

    #[test]
    fn logistic_hessian_floored_at_saturation() {
        let obj = host_obj::<Logistic>();
        let out = gradient(&obj, &[40.0, -40.0], &[1.0, 0.0]);
        assert!(out[0].hess > 0.0);
        assert!(out[1].hess > 0.0);
    }

    #[test]
    fn weighted_gradients_scale_grad_and_hess() {
        let obj = host_obj::<SquaredError>();
        let mut p = HostDeviceVector::from_vec(vec![1.0f32, 2.0]);
        let labels = [0.5f32, 2.5];
        let weights = [2.0f32, 0.5];
        let out = obj
            .get_gradient(&mut p, LabeledData::new(&labels, &weights), 0)
            .unwrap()
            .into_host_vec();
        assert!((out[0].grad - 1.0).abs() < 1e-6);
        assert!((out[1].grad + 0.25).abs() < 1e-6);
        assert!((out[0].hess - 2.0).abs() < 1e-6);
        assert!((out[1].hess - 0.5).abs() < 1e-6);
    }

    #[test]
    fn poisson_max_delta_step_enters_hessian_only() {
        let mut obj = host_obj::<Poisson>();
        obj.configure(&[("max_delta_step".to_string(), "0.7".to_string())])
            .unwrap();
        let out = gradient(&obj, &[0.0], &[2.0]);
        assert!((out[0].grad + 1.0).abs() < 1e-6);
        assert!((out[0].hess - 0.7f32.exp()).abs() < 1e-5);
    }

    #[test]
    fn poisson_rejects_negative_step() {
        let mut obj = host_obj::<Poisson>();
        let err = obj
            .configure(&[("max_delta_step".to_string(), "-1".to_string())])
            .unwrap_err();
        assert!(matches!(err, ObjectiveError::InvalidParameter { name: "max_delta_step", .. }));
    }

    #[test]
    fn tweedie_metric_carries_power() {
        let mut obj = host_obj::<Tweedie>();
        assert_eq!(obj.default_eval_metric(), "tweedie-nloglik@1.5");
        obj.configure(&[("tweedie_variance_power".to_string(), "1.1".to_string())])
            .unwrap();
        assert_eq!(obj.default_eval_metric(), "tweedie-nloglik@1.1");
    }

    #[test]
    fn tweedie_rejects_power_outside_open_interval() {
        let mut obj = host_obj::<Tweedie>();
        for bad in ["1", "2", "0.5", "abc"] {
            assert!(obj
                .configure(&[("tweedie_variance_power".to_string(), bad.to_string())])
                .is_err());
        }
    }

    #[test]
    fn unrecognized_parameters_are_ignored() {
        let mut obj = host_obj::<Poisson>();
        obj.configure(&[
            ("learning_rate".to_string(), "0.3".to_string()),
            ("num_round".to_string(), "100".to_string()),
        ])
        .unwrap();
    }

    #[test]
    fn extreme_margins_stay_finite() {
        for out in [
            gradient(&host_obj::<Poisson>(), &[1e4, -1e4], &[1.0, 1.0]),
            gradient(&host_obj::<Gamma>(), &[1e4, -1e4], &[1.0, 1.0]),
            gradient(&host_obj::<Tweedie>(), &[1e4, -1e4], &[1.0, 1.0]),
        ] {
            for p in out {
                assert!(p.grad.is_finite());
                assert!(p.hess.is_finite());
            }
        }
    }

    #[test]
    fn bad_label_fails_before_any_output() {
        let obj = host_obj::<Gamma>();
        let mut p = HostDeviceVector::from_vec(vec![0.0f32, 0.0]);
        let labels = [1.0f32, -1.0];
        let err = obj
            .get_gradient(&mut p, LabeledData::new(&labels, &[]), 0)
            .unwrap_err();
        assert!(matches!(err, ObjectiveError::LabelDomain { row: 1, .. }));
    }
}
