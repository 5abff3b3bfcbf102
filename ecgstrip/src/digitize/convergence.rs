use std::ops::RangeInclusive;

use tracing::trace;

/// Which side of the target range a probe landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    TooFew,
    TooMany,
}

/// A feature search driven by adjustable thresholds.
///
/// `probe` classifies and collects features under a parameter set, `count`
/// says how many were found and `adjust` moves the parameters after a miss.
/// Returning `None` from `adjust` means the parameters hit their bounds and
/// the search cannot continue.
pub trait AdaptiveSearch {
    type Params: Clone;
    type Found;

    fn probe(&self, params: &Self::Params) -> Self::Found;
    fn count(&self, found: &Self::Found) -> usize;
    fn adjust(&self, params: &Self::Params, miss: Miss) -> Option<Self::Params>;
}

/// Final state of a bounded search.
#[derive(Debug, Clone)]
pub struct Outcome<P, F> {
    /// Parameters of the last probe.
    pub params: P,
    /// Features found by the last probe.
    pub found: F,
    /// Number of probes run.
    pub iterations: u32,
    /// Whether the last probe's count fell in the target range.
    pub converged: bool,
}

/// Probe, adjust and re-probe until the feature count lands in `target`, the
/// parameters can no longer move, or `max_iterations` probes have run.
pub fn converge<S: AdaptiveSearch>(
    search: &S,
    initial: S::Params,
    target: RangeInclusive<usize>,
    max_iterations: u32,
) -> Outcome<S::Params, S::Found> {
    let max_iterations = max_iterations.max(1);
    let mut params = initial;
    let mut found = search.probe(&params);
    let mut iterations = 1;

    loop {
        let count = search.count(&found);
        trace!(iteration = iterations, count, "convergence probe");

        if target.contains(&count) {
            return Outcome {
                params,
                found,
                iterations,
                converged: true,
            };
        }
        if iterations >= max_iterations {
            break;
        }

        let miss = if count < *target.start() {
            Miss::TooFew
        } else {
            Miss::TooMany
        };
        match search.adjust(&params, miss) {
            Some(next) => params = next,
            None => break,
        }
        found = search.probe(&params);
        iterations += 1;
    }

    Outcome {
        params,
        found,
        iterations,
        converged: false,
    }
}
