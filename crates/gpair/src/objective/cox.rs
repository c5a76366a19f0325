//! Cox proportional-hazards objective.
//!
//! Unlike the pointwise families, the partial-likelihood gradient of each
//! example depends on every example with an earlier-or-equal event time, so
//! the computation is a sort followed by a single sequential sweep rather
//! than an elementwise map. The sweep always executes on the host.

use std::cmp::Ordering;

use super::{GradPair, LabeledData, ObjectiveFn};
use crate::context::DeviceContext;
use crate::error::ObjectiveError;
use crate::vector::HostDeviceVector;

/// Survival objective over right-censored event times.
///
/// # Label convention
///
/// A label encodes both the event time and the censoring status: the time
/// is `|label|`, and a non-positive label (zero included) marks a censored
/// observation. Censored rows stay in the risk-set denominators of every
/// earlier-or-equal event but contribute no event term of their own.
///
/// # Algorithm
///
/// Indices are sorted by ascending event time; within a tied time, censored
/// rows come before event rows, then ties fall back to the margin. This
/// ordering is a function of row content only, so each example's gradient
/// pair is independent of the input order. One sweep then walks the sorted
/// indices maintaining the risk-set sum of `exp(margin)` (decremented only
/// when time strictly increases, so tied rows share a risk set) and the
/// running event accumulators `r = sum(1/S)` and `s = sum(1/S^2)`, giving
///
/// ```text
/// grad = exp(m) * r - [event]
/// hess = exp(m) * r - exp(m)^2 * s
/// ```
///
/// per example, each scaled by its weight. All exponentials subtract the
/// batch's maximum margin first; `grad` and `hess` are exactly invariant
/// under that shift, and it keeps extreme margins from overflowing.
/// Accumulation runs in `f64`.
#[derive(Debug, Clone)]
pub struct CoxPhObjective {
    ctx: DeviceContext,
}

impl CoxPhObjective {
    pub fn new(ctx: &DeviceContext) -> Self {
        Self { ctx: *ctx }
    }
}

impl ObjectiveFn for CoxPhObjective {
    fn name(&self) -> &'static str {
        "cox-proportional-hazards"
    }

    fn get_gradient(
        &self,
        preds: &mut HostDeviceVector<f32>,
        data: LabeledData<'_>,
        _iteration: u32,
    ) -> Result<HostDeviceVector<GradPair>, ObjectiveError> {
        data.validate(preds.len())?;
        let labels = data.labels;
        for (row, &y) in labels.iter().enumerate() {
            if y.is_nan() {
                return Err(ObjectiveError::LabelDomain {
                    objective: self.name(),
                    constraint: "label must encode a finite event time",
                    label: y,
                    row,
                });
            }
        }

        let margins = preds.host();
        let n = margins.len();
        if n == 0 {
            return Ok(HostDeviceVector::from_vec(Vec::new()));
        }

        // Content-keyed sort: ascending time, censored before events within
        // a tied time, then by margin. Keeps per-example results invariant
        // under input permutation.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            let (ta, tb) = (labels[a].abs(), labels[b].abs());
            ta.partial_cmp(&tb)
                .unwrap_or(Ordering::Equal)
                .then_with(|| (labels[a] > 0.0).cmp(&(labels[b] > 0.0)))
                .then_with(|| {
                    margins[a]
                        .partial_cmp(&margins[b])
                        .unwrap_or(Ordering::Equal)
                })
        });

        // Overflow guard: shift every exponent by the max margin.
        let max_margin = margins.iter().cloned().fold(f32::NEG_INFINITY, f32::max) as f64;
        let exp_p: Vec<f64> = margins
            .iter()
            .map(|&m| (m as f64 - max_margin).exp())
            .collect();

        // Risk-set denominator starts as the full cohort and shrinks as the
        // sweep moves forward in time.
        let mut risk_sum: f64 = exp_p.iter().sum();

        let mut out = vec![GradPair::default(); n];
        let mut r_k = 0.0f64;
        let mut s_k = 0.0f64;
        let mut last_exp_p = 0.0f64;
        let mut last_time = 0.0f64;
        let mut accumulated = 0.0f64;

        for &ind in &order {
            let e = exp_p[ind];
            let time = labels[ind].abs() as f64;
            let w = data.weight(ind) as f64;

            // Rows leave the risk set only once time strictly increases, so
            // tied times share one denominator (Breslow).
            accumulated += last_exp_p;
            if last_time < time {
                risk_sum -= accumulated;
                accumulated = 0.0;
            }

            let event = labels[ind] > 0.0;
            if event {
                r_k += 1.0 / risk_sum;
                s_k += 1.0 / (risk_sum * risk_sum);
            }

            let grad = e * r_k - f64::from(event as u8);
            let hess = e * r_k - e * e * s_k;
            out[ind] = GradPair {
                grad: (grad * w) as f32,
                hess: (hess * w) as f32,
            };

            last_exp_p = e;
            last_time = time;
        }

        Ok(HostDeviceVector::from_vec(out))
    }

    fn pred_transform(&self, io_preds: &mut HostDeviceVector<f32>) {
        // Hazard-ratio scale. Host execution, like the gradient sweep.
        self.ctx
            .parallelism()
            .maybe_par_map_inplace(io_preds.host_mut(), |m| m.exp());
    }

    fn prob_to_margin(&self, base_score: f32) -> Result<f32, ObjectiveError> {
        if base_score <= 0.0 {
            return Err(ObjectiveError::Domain {
                value: base_score,
                constraint: "hazard ratio must be > 0",
            });
        }
        Ok(base_score.ln())
    }

    fn default_eval_metric(&self) -> String {
        "cox-nloglik".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cox_gradient(preds: &[f32], labels: &[f32]) -> Vec<GradPair> {
        let obj = CoxPhObjective::new(&DeviceContext::host());
        let mut p = HostDeviceVector::from_vec(preds.to_vec());
        obj.get_gradient(&mut p, LabeledData::new(labels, &[]), 0)
            .unwrap()
            .into_host_vec()
    }

    #[test]
    fn censoring_splits_numerator_from_risk_set() {
        // Censored at t=1 (before the event: no event term, zero pair),
        // event at t=2, censored at t=3 (in the event's risk set: positive
        // gradient, no numerator of its own).
        let out = cox_gradient(&[0.2, -0.1, 0.0], &[-1.0, 2.0, -3.0]);
        assert_eq!(out[0].grad, 0.0);
        assert_eq!(out[0].hess, 0.0);
        assert!(out[1].grad < 0.0);
        assert!(out[1].hess > 0.0);
        assert!(out[2].grad > 0.0);
        assert!(out[2].hess > 0.0);
    }

    #[test]
    fn single_event_risk_set_of_one() {
        // One event, alone in its risk set: grad = 1 - 1 = 0, hess = 0.
        let out = cox_gradient(&[0.3], &[5.0]);
        assert!(out[0].grad.abs() < 1e-6);
        assert!(out[0].hess.abs() < 1e-6);
    }

    #[test]
    fn margin_shift_invariance() {
        let labels = [2.0f32, -3.0, 4.0, 1.0];
        let base = cox_gradient(&[0.1, 0.4, -0.2, 0.9], &labels);
        // exp(m) rescales numerator and denominator alike.
        let shifted = cox_gradient(&[100.1, 100.4, 99.8, 100.9], &labels);
        for (a, b) in base.iter().zip(&shifted) {
            assert!((a.grad - b.grad).abs() < 1e-4);
            assert!((a.hess - b.hess).abs() < 1e-4);
        }
    }

    #[test]
    fn nan_label_rejected() {
        let obj = CoxPhObjective::new(&DeviceContext::host());
        let mut p = HostDeviceVector::from_vec(vec![0.0f32]);
        let labels = [f32::NAN];
        assert!(obj
            .get_gradient(&mut p, LabeledData::new(&labels, &[]), 0)
            .is_err());
    }

    #[test]
    fn pred_transform_is_exp() {
        let obj = CoxPhObjective::new(&DeviceContext::host());
        let mut io = HostDeviceVector::from_vec(vec![0.0f32, 1.0]);
        obj.pred_transform(&mut io);
        assert!((io.host()[0] - 1.0).abs() < 1e-6);
        assert!((io.host()[1] - std::f32::consts::E).abs() < 1e-5);
    }
}
