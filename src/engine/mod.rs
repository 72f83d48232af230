pub mod detector;

pub use detector::SpikeDetector;
