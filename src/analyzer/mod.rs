// Analyzer module: alert rules over consecutive price readings.

pub mod alerts;

pub use alerts::AlertEvaluator;
