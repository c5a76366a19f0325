//! gpair: objective functions for gradient boosted training loops.
//!
//! At each boosting round the training loop asks an objective for the
//! first- and second-order derivatives of its loss with respect to the
//! current raw predictions (the "margin"); the resulting gradient pairs
//! drive the next tree fit. At inference time the same objective maps raw
//! margins onto its natural prediction scale.
//!
//! # Key Types
//!
//! - [`ObjectiveFn`] - the common contract every loss family implements
//! - [`ObjectiveRegistry`] / [`create_objective`] - name-keyed factory
//! - [`GradPair`] - one (gradient, hessian) pair per example
//! - [`HostDeviceVector`] - mirrored host/accelerator buffer with lazy sync
//! - [`DeviceContext`] - execution backend selection (threads, accelerators)
//! - [`LabeledData`] - borrowed label/weight provider
//!
//! # Available Objectives
//!
//! - `squared-error`: plain L2 regression
//! - `logistic-probability`: binary log loss, predictions on the
//!   probability scale
//! - `logistic-raw`: binary log loss, predictions left on the margin scale
//! - `poisson`: count regression in log space
//! - `gamma`: positive-valued regression in log space
//! - `tweedie`: compound Poisson-Gamma regression (variance power in (1, 2))
//! - `cox-proportional-hazards`: survival analysis over censored event times
//!
//! # Weighted Training
//!
//! All objectives accept per-example weights. Pass an empty slice `&[]`
//! for unweighted computation.
//!
//! # Example
//!
//! ```
//! use gpair::{create_objective, DeviceContext, HostDeviceVector, LabeledData};
//!
//! let ctx = DeviceContext::host();
//! let obj = create_objective("squared-error", &ctx).unwrap();
//!
//! let mut preds = HostDeviceVector::from_vec(vec![0.0f32, 0.5, 1.0]);
//! let labels = [0.0f32, 1.0, 1.0];
//! let pairs = obj
//!     .get_gradient(&mut preds, LabeledData::new(&labels, &[]), 0)
//!     .unwrap();
//! assert_eq!(pairs.len(), 3);
//! ```

pub mod context;
pub mod dispatch;
pub mod error;
pub mod objective;
pub mod utils;
pub mod vector;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use context::{Backend, DeviceContext};
pub use error::ObjectiveError;
pub use objective::{
    create_objective, CoxPhObjective, GammaObjective, GradPair, LabeledData, LogisticObjective,
    LogitRawObjective, ObjectiveFn, ObjectiveRegistry, PoissonObjective, SquaredErrorObjective,
    TweedieObjective,
};
pub use utils::Parallelism;
pub use vector::{HostDeviceVector, SyncState};
