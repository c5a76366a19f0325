//! Execution dispatcher for elementwise objective sweeps.
//!
//! Pointwise loss families are pure per-example maps with no inter-element
//! dependency, so the same logical kernel can run either as a parallel loop
//! over host memory or as a data-parallel kernel over the device copy of a
//! [`HostDeviceVector`]. The choice is made per call from the configured
//! [`DeviceContext`]; both paths must agree within floating-point tolerance.

use crate::context::{Backend, DeviceContext};
use crate::objective::{GradPair, LabeledData};
use crate::utils::Parallelism;
use crate::vector::HostDeviceVector;

/// Produce one gradient pair per example from `(margin, label, weight)`.
///
/// On the host backend this is a `rayon`-parallel loop (sequential when the
/// context asks for one thread). On the accelerator backend the kernel is
/// launched over the device-resident copy of `preds` and writes a
/// device-resident result; labels and weights are read unified-memory
/// style. The returned vector is freshly allocated and owned by the caller.
pub fn map_gradient<F>(
    ctx: &DeviceContext,
    preds: &mut HostDeviceVector<f32>,
    data: LabeledData<'_>,
    f: F,
) -> HostDeviceVector<GradPair>
where
    F: Fn(f32, f32, f32) -> GradPair + Sync,
{
    let n = preds.len();
    match ctx.backend() {
        Backend::Host => {
            let margins = preds.host();
            let mut out = vec![GradPair::default(); n];
            ctx.parallelism().maybe_par_fill(&mut out, |i| {
                f(margins[i], data.labels[i], data.weight(i))
            });
            HostDeviceVector::from_vec(out)
        }
        Backend::Accelerator => {
            let margins = preds.device();
            let mut out = HostDeviceVector::with_len_on_device(n);
            // Kernel launch: every element is independent.
            Parallelism::Parallel.maybe_par_fill(out.device_mut(), |i| {
                f(margins[i], data.labels[i], data.weight(i))
            });
            out
        }
    }
}

/// Map every margin in place on the configured backend.
pub fn transform_inplace<F>(ctx: &DeviceContext, io_preds: &mut HostDeviceVector<f32>, f: F)
where
    F: Fn(f32) -> f32 + Sync,
{
    match ctx.backend() {
        Backend::Host => {
            ctx.parallelism().maybe_par_map_inplace(io_preds.host_mut(), &f);
        }
        Backend::Accelerator => {
            Parallelism::Parallel.maybe_par_map_inplace(io_preds.device_mut(), &f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_map_backends_agree() {
        let preds: Vec<f32> = (0..64).map(|i| i as f32 * 0.1 - 3.0).collect();
        let labels: Vec<f32> = (0..64).map(|i| (i % 5) as f32).collect();
        let data = LabeledData::new(&labels, &[]);
        let kernel = |m: f32, y: f32, w: f32| GradPair {
            grad: w * (m - y),
            hess: w,
        };

        let mut host_preds = HostDeviceVector::from_vec(preds.clone());
        let host_out =
            map_gradient(&DeviceContext::host(), &mut host_preds, data, kernel).into_host_vec();

        let mut dev_preds = HostDeviceVector::from_vec(preds);
        let dev_out = map_gradient(
            &DeviceContext::with_accelerators(1),
            &mut dev_preds,
            data,
            kernel,
        )
        .into_host_vec();

        assert_eq!(host_out, dev_out);
    }

    #[test]
    fn accelerator_result_starts_device_resident() {
        let mut preds = HostDeviceVector::from_vec(vec![0.0f32, 1.0]);
        let labels = [0.0f32, 0.0];
        let out = map_gradient(
            &DeviceContext::with_accelerators(1),
            &mut preds,
            LabeledData::new(&labels, &[]),
            |m, y, w| GradPair {
                grad: w * (m - y),
                hess: w,
            },
        );
        assert_eq!(out.state(), crate::vector::SyncState::DeviceNewer);
        assert_eq!(preds.transfer_counts(), (1, 0));
    }

    #[test]
    fn transform_inplace_host_and_device() {
        let mut a = HostDeviceVector::from_vec(vec![0.0f32, 1.0, 2.0]);
        transform_inplace(&DeviceContext::host(), &mut a, |m| m * 2.0);
        assert_eq!(a.host(), &[0.0, 2.0, 4.0]);

        let mut b = HostDeviceVector::from_vec(vec![0.0f32, 1.0, 2.0]);
        transform_inplace(&DeviceContext::with_accelerators(1), &mut b, |m| m * 2.0);
        assert_eq!(b.host(), &[0.0, 2.0, 4.0]);
    }
}
