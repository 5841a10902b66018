//! Tracing hooks for the executor.
//!
//! Compiled to no-ops unless the `tracing` feature is on; the binary layer
//! decides where events go.

#[cfg(feature = "tracing")]
pub fn batch_started(batch: &str, strategy: &str, nodes: usize) {
    tracing::debug!(batch, strategy, nodes, "batch started");
}

#[cfg(not(feature = "tracing"))]
pub fn batch_started(_batch: &str, _strategy: &str, _nodes: usize) { /* no-op */
}

#[cfg(feature = "tracing")]
pub fn rule_applied(batch: &str, rule: &str, iteration: usize) {
    tracing::trace!(batch, rule, iteration, "rule applied");
}

#[cfg(not(feature = "tracing"))]
pub fn rule_applied(_batch: &str, _rule: &str, _iteration: usize) { /* no-op */
}

#[cfg(feature = "tracing")]
pub fn batch_finished(batch: &str, outcome: &str, iterations: usize, fingerprint: &str) {
    tracing::debug!(batch, outcome, iterations, fingerprint, "batch finished");
}

#[cfg(not(feature = "tracing"))]
pub fn batch_finished(_batch: &str, _outcome: &str, _iterations: usize, _fingerprint: &str) {
    /* no-op */
}

#[cfg(feature = "tracing")]
pub fn non_converged(batch: &str, iterations: usize) {
    tracing::warn!(
        batch,
        iterations,
        "batch hit its iteration cap before reaching a fixed point"
    );
}

#[cfg(not(feature = "tracing"))]
pub fn non_converged(_batch: &str, _iterations: usize) { /* no-op */
}
