//! Name-based lookup of effort calculators.

use crate::core::effort::EffortCalculator;
use std::collections::BTreeMap;

/// Constructor for a calculator variant.
pub type CalculatorFactory = fn() -> EffortCalculator;

/// Maps stable mode identifiers to calculator constructors.
#[derive(Debug, Clone)]
pub struct ModeRegistry {
    modes: BTreeMap<&'static str, CalculatorFactory>,
}

impl ModeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            modes: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in calculator.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("EffortPSD", || EffortCalculator::Psd);
        registry.register("EffortBaselineModulation", || {
            EffortCalculator::BaselineModulation
        });
        registry.register("EffortAmplitudeModulation", || {
            EffortCalculator::AmplitudeModulation
        });
        registry.register("EffortDerivative", || EffortCalculator::Derivative);
        registry.register("EffortHeartRate", || EffortCalculator::HeartRate);
        registry.register("EffortFused", || EffortCalculator::Fused);
        registry
    }

    /// Register (or replace) a mode.
    pub fn register(&mut self, name: &'static str, factory: CalculatorFactory) {
        self.modes.insert(name, factory);
    }

    /// Build the calculator registered under `name`.
    pub fn create(&self, name: &str) -> Option<EffortCalculator> {
        self.modes.get(name).map(|factory| factory())
    }

    /// Registered mode names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.modes.keys().map(|name| name.to_string()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
