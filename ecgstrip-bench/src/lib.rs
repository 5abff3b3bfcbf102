pub mod catalog;
pub mod distortion;
pub mod metrics;
pub mod report;
pub mod scene;
