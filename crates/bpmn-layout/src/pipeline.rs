//! The pipeline runner.
//!
//! A pipeline is a read-only ordered list of named steps run against a
//! context. The runner times every step, logs it, optionally tracks how many
//! elements a step moved, checks for cooperative cancellation between steps
//! and wraps any failure with the failing step's name.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use bpmn_diagram::geom::Point;
use bpmn_diagram::{Diagram, Id};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{LayoutError, LayoutResult};

/// A cooperative cancellation flag, checked between pipeline steps.
///
/// Cancelling never rolls anything back: the diagram keeps the state of the
/// steps that already committed.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// A fresh, uncancelled flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One pipeline step.
pub struct Step<C> {
    /// The step's name, used in logs and error messages.
    pub name: &'static str,
    /// The step body.
    pub run: fn(&mut C) -> LayoutResult<()>,
    /// Skip predicate; a skipped step is logged but not run.
    pub skip: Option<fn(&C) -> bool>,
    /// Whether to count the elements this step moves.
    pub track_delta: bool,
}

impl<C> Step<C> {
    /// A plain step.
    pub fn new(name: &'static str, run: fn(&mut C) -> LayoutResult<()>) -> Self {
        Self { name, run, skip: None, track_delta: false }
    }

    /// Attach a skip predicate.
    pub fn skip_if(mut self, skip: fn(&C) -> bool) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Track how many elements the step moves.
    pub fn tracked(mut self) -> Self {
        self.track_delta = true;
        self
    }
}

/// A context a pipeline can run against.
pub trait PipelineContext {
    /// The diagram under layout, for delta tracking.
    fn diagram(&self) -> &Diagram;
}

/// An ordered list of steps plus the runner.
pub struct Pipeline<C> {
    steps: Vec<Step<C>>,
}

impl<C: PipelineContext> Pipeline<C> {
    /// Create a pipeline from its steps.
    pub fn new(steps: Vec<Step<C>>) -> Self {
        Self { steps }
    }

    /// Run all steps in order.
    ///
    /// A failing step aborts the remainder; its error is wrapped as
    /// `Pipeline step "<name>" failed: …` with the original as cause.
    pub fn run(&self, ctx: &mut C, cancellation: &Cancellation) -> LayoutResult<()> {
        for step in &self.steps {
            if cancellation.is_cancelled() {
                debug!("pipeline cancelled");
                return Err(LayoutError::Cancelled);
            }
            if step.skip.is_some_and(|skip| skip(ctx)) {
                debug!(step = step.name, "pipeline step skipped");
                continue;
            }

            let before = step.track_delta.then(|| snapshot_positions(ctx.diagram()));
            let started = Instant::now();
            (step.run)(ctx).map_err(|source| LayoutError::Step {
                name: step.name,
                source: Box::new(source),
            })?;
            let elapsed = started.elapsed();

            match before {
                Some(before) => {
                    let moved = count_moved(&before, ctx.diagram());
                    debug!(step = step.name, ?elapsed, moved, "pipeline step finished");
                }
                None => debug!(step = step.name, ?elapsed, "pipeline step finished"),
            }
        }
        Ok(())
    }
}

/// Shape centres before a tracked step.
fn snapshot_positions(diagram: &Diagram) -> FxHashMap<Id, Point> {
    diagram
        .shapes()
        .map(|shape| (shape.id.clone(), shape.bounds.center()))
        .collect()
}

/// How many shapes moved by more than one pixel.
fn count_moved(before: &FxHashMap<Id, Point>, diagram: &Diagram) -> usize {
    diagram
        .shapes()
        .filter(|shape| match before.get(&shape.id) {
            Some(&previous) => !shape.bounds.center().approx_eq(previous, 1.0),
            None => true,
        })
        .count()
}
