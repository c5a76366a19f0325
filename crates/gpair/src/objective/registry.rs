//! Name-keyed objective factory.

use std::collections::HashMap;

use super::{
    CoxPhObjective, GammaObjective, LogisticObjective, LogitRawObjective, ObjectiveFn,
    PoissonObjective, SquaredErrorObjective, TweedieObjective,
};
use crate::context::DeviceContext;
use crate::error::ObjectiveError;

/// Constructor registered for one loss family.
pub type ObjectiveCtor = fn(&DeviceContext) -> Box<dyn ObjectiveFn>;

/// Maps loss-family names to constructors.
///
/// The built-in families are always registered; [`register`](Self::register)
/// adds new ones, making the set of objectives an open extension point.
///
/// # Example
///
/// ```
/// use gpair::{DeviceContext, ObjectiveRegistry};
///
/// let registry = ObjectiveRegistry::with_builtins();
/// let mut obj = registry
///     .create("tweedie", &DeviceContext::host())
///     .unwrap();
/// obj.configure(&[("tweedie_variance_power".into(), "1.3".into())])
///     .unwrap();
/// ```
pub struct ObjectiveRegistry {
    ctors: HashMap<&'static str, ObjectiveCtor>,
}

impl ObjectiveRegistry {
    /// Registry holding every built-in loss family.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            ctors: HashMap::new(),
        };
        registry.register("squared-error", |ctx| {
            Box::new(SquaredErrorObjective::new(ctx))
        });
        registry.register("logistic-probability", |ctx| {
            Box::new(LogisticObjective::new(ctx))
        });
        registry.register("logistic-raw", |ctx| Box::new(LogitRawObjective::new(ctx)));
        registry.register("poisson", |ctx| Box::new(PoissonObjective::new(ctx)));
        registry.register("gamma", |ctx| Box::new(GammaObjective::new(ctx)));
        registry.register("tweedie", |ctx| Box::new(TweedieObjective::new(ctx)));
        registry.register("cox-proportional-hazards", |ctx| {
            Box::new(CoxPhObjective::new(ctx))
        });
        registry
    }

    /// Register (or replace) a family under `name`.
    pub fn register(&mut self, name: &'static str, ctor: ObjectiveCtor) {
        self.ctors.insert(name, ctor);
    }

    /// Registered family names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.ctors.keys().copied()
    }

    /// Instantiate the family registered under `name`.
    pub fn create(
        &self,
        name: &str,
        ctx: &DeviceContext,
    ) -> Result<Box<dyn ObjectiveFn>, ObjectiveError> {
        match self.ctors.get(name) {
            Some(ctor) => Ok(ctor(ctx)),
            None => Err(ObjectiveError::UnknownObjective(name.to_string())),
        }
    }
}

impl Default for ObjectiveRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// One-shot factory over the built-in families.
pub fn create_objective(
    name: &str,
    ctx: &DeviceContext,
) -> Result<Box<dyn ObjectiveFn>, ObjectiveError> {
    ObjectiveRegistry::with_builtins().create(name, ctx)
}
