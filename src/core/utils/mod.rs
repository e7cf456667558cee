/// Seeded random streams
pub mod random;
/// Running mean and variance accumulators
pub mod stats;
