//! The operator contract: `Gatherer<In, S, Out>`.
//!
//! A gatherer bundles four functions over a private state cell `S`:
//!
//! - initializer: `() -> S`, called once per partition;
//! - integrator: `(&mut S, In, &mut dyn Downstream<Out>) -> Result<bool>`,
//!   called once per element in partition order. `Ok(false)` asks the driver
//!   to stop feeding this partition;
//! - combiner: `(S, S) -> Result<S>`, merges adjacent partitions, left first.
//!   Absent for SEQUENTIAL gatherers;
//! - finisher: `(S, &mut dyn Downstream<Out>) -> Result<()>`, called exactly
//!   once on the merged state. Absent means no-op.
//!
//! `combine` and `finish` take the state by value, so a state cell cannot be
//! merged twice or read after it was finished.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use gatherflow_core::capability::Capabilities;

use crate::traits::{Downstream, OpError};

pub type InitFn<S> = Arc<dyn Fn() -> S + Send + Sync>;
pub type IntegrateFn<S, In, Out> =
    Arc<dyn Fn(&mut S, In, &mut dyn Downstream<Out>) -> Result<bool, OpError> + Send + Sync>;
pub type CombineFn<S> = Arc<dyn Fn(S, S) -> Result<S, OpError> + Send + Sync>;
pub type FinishFn<S, Out> =
    Arc<dyn Fn(S, &mut dyn Downstream<Out>) -> Result<(), OpError> + Send + Sync>;

/// Per-element function of a gatherer, tagged with its greediness.
pub enum Integrator<S, In, Out> {
    /// Never consults the downstream's answer to decide whether to continue.
    Greedy(IntegrateFn<S, In, Out>),
    /// May stop early, either on its own or because the downstream refused.
    General(IntegrateFn<S, In, Out>),
}

impl<S, In, Out> Integrator<S, In, Out> {
    pub fn of<F>(f: F) -> Self
    where
        F: Fn(&mut S, In, &mut dyn Downstream<Out>) -> Result<bool, OpError>
            + Send
            + Sync
            + 'static,
    {
        Integrator::General(Arc::new(f))
    }

    pub fn greedy<F>(f: F) -> Self
    where
        F: Fn(&mut S, In, &mut dyn Downstream<Out>) -> Result<bool, OpError>
            + Send
            + Sync
            + 'static,
    {
        Integrator::Greedy(Arc::new(f))
    }

    pub fn is_greedy(&self) -> bool {
        matches!(self, Integrator::Greedy(_))
    }

    fn function(&self) -> &IntegrateFn<S, In, Out> {
        match self {
            Integrator::Greedy(f) | Integrator::General(f) => f,
        }
    }
}

impl<S, In, Out> Clone for Integrator<S, In, Out> {
    fn clone(&self) -> Self {
        match self {
            Integrator::Greedy(f) => Integrator::Greedy(Arc::clone(f)),
            Integrator::General(f) => Integrator::General(Arc::clone(f)),
        }
    }
}

enum Initializer<S> {
    /// Built by the stateless constructors; every partition gets the same token.
    Stateless(fn() -> S),
    Supplied(InitFn<S>),
}

impl<S> Clone for Initializer<S> {
    fn clone(&self) -> Self {
        match self {
            Initializer::Stateless(f) => Initializer::Stateless(*f),
            Initializer::Supplied(f) => Initializer::Supplied(Arc::clone(f)),
        }
    }
}

/// Immutable operator descriptor. Cloning is cheap and shares the functions.
pub struct Gatherer<In, S, Out> {
    name: Cow<'static, str>,
    initializer: Initializer<S>,
    integrator: Integrator<S, In, Out>,
    combiner: Option<CombineFn<S>>,
    finisher: Option<FinishFn<S, Out>>,
}

impl<In, S, Out> Gatherer<In, S, Out> {
    /// Full form: a gatherer that can run on several partitions.
    pub fn of<I, C, F>(
        initializer: I,
        integrator: Integrator<S, In, Out>,
        combiner: C,
        finisher: F,
    ) -> Self
    where
        I: Fn() -> S + Send + Sync + 'static,
        C: Fn(S, S) -> Result<S, OpError> + Send + Sync + 'static,
        F: Fn(S, &mut dyn Downstream<Out>) -> Result<(), OpError> + Send + Sync + 'static,
    {
        Self {
            name: Cow::Borrowed("gatherer"),
            initializer: Initializer::Supplied(Arc::new(initializer)),
            integrator,
            combiner: Some(Arc::new(combiner)),
            finisher: Some(Arc::new(finisher)),
        }
    }

    /// No combiner: the driver never splits this gatherer's input.
    pub fn of_sequential<I>(initializer: I, integrator: Integrator<S, In, Out>) -> Self
    where
        I: Fn() -> S + Send + Sync + 'static,
    {
        Self {
            name: Cow::Borrowed("gatherer"),
            initializer: Initializer::Supplied(Arc::new(initializer)),
            integrator,
            combiner: None,
            finisher: None,
        }
    }

    pub fn of_sequential_with_finisher<I, F>(
        initializer: I,
        integrator: Integrator<S, In, Out>,
        finisher: F,
    ) -> Self
    where
        I: Fn() -> S + Send + Sync + 'static,
        F: Fn(S, &mut dyn Downstream<Out>) -> Result<(), OpError> + Send + Sync + 'static,
    {
        Self::of_sequential(initializer, integrator).with_finisher(finisher)
    }

    /// Stable, human-readable name used in logs and run manifests.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_finisher<F>(mut self, finisher: F) -> Self
    where
        F: Fn(S, &mut dyn Downstream<Out>) -> Result<(), OpError> + Send + Sync + 'static,
    {
        self.finisher = Some(Arc::new(finisher));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability flags derived from how this gatherer was built.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_flags(
            !self.can_combine(),
            matches!(self.initializer, Initializer::Stateless(_)),
            self.integrator.is_greedy(),
        )
    }

    pub fn can_combine(&self) -> bool {
        self.combiner.is_some()
    }

    pub fn has_finisher(&self) -> bool {
        self.finisher.is_some()
    }

    /// Create a fresh state cell for one partition.
    pub fn initialize(&self) -> S {
        match &self.initializer {
            Initializer::Stateless(f) => f(),
            Initializer::Supplied(f) => f(),
        }
    }

    pub fn integrate(
        &self,
        state: &mut S,
        element: In,
        downstream: &mut dyn Downstream<Out>,
    ) -> Result<bool, OpError> {
        (self.integrator.function())(state, element, downstream)
    }

    /// Merge two adjacent partition states, `left` first in input order.
    pub fn combine(&self, left: S, right: S) -> Result<S, OpError> {
        match &self.combiner {
            Some(f) => f(left, right),
            None => Err(OpError::NotCombinable(format!(
                "'{}' was built without a combiner",
                self.name
            ))),
        }
    }

    pub fn finish(&self, state: S, downstream: &mut dyn Downstream<Out>) -> Result<(), OpError> {
        match &self.finisher {
            Some(f) => f(state, downstream),
            None => Ok(()),
        }
    }
}

impl<In, Out> Gatherer<In, (), Out> {
    /// Integrator-only gatherer: no state, identity combiner.
    pub fn stateless(integrator: Integrator<(), In, Out>) -> Self {
        Self {
            name: Cow::Borrowed("gatherer"),
            initializer: Initializer::Stateless(|| ()),
            integrator,
            combiner: Some(Arc::new(|_: (), _: ()| Ok::<(), OpError>(()))),
            finisher: None,
        }
    }

    /// Integrator-only gatherer that must still see its input in one piece.
    pub fn stateless_sequential(integrator: Integrator<(), In, Out>) -> Self {
        Self {
            name: Cow::Borrowed("gatherer"),
            initializer: Initializer::Stateless(|| ()),
            integrator,
            combiner: None,
            finisher: None,
        }
    }
}

impl<In, S, Out> Clone for Gatherer<In, S, Out> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            initializer: self.initializer.clone(),
            integrator: self.integrator.clone(),
            combiner: self.combiner.clone(),
            finisher: self.finisher.clone(),
        }
    }
}

impl<In, S, Out> fmt::Debug for Gatherer<In, S, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gatherer")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities())
            .field("finisher", &self.has_finisher())
            .finish()
    }
}
