use std::fmt;

use rand::seq::SliceRandom;

/// Reorders the candidate gateway names before dispatch.
///
/// Implementations must be total: every input produces an output, and no name is dropped.
pub trait Strategy: fmt::Debug + Send + Sync {
    fn apply(&self, gateways: Vec<String>) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Case-sensitive lexicographic order. This is the default strategy.
pub struct OrderStrategy;

impl Strategy for OrderStrategy {
    fn apply(&self, mut gateways: Vec<String>) -> Vec<String> {
        gateways.sort();
        gateways
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Uniform shuffle; every call draws from a freshly seeded generator.
pub struct RandomStrategy;

impl Strategy for RandomStrategy {
    fn apply(&self, mut gateways: Vec<String>) -> Vec<String> {
        gateways.shuffle(&mut rand::rng());
        gateways
    }
}
