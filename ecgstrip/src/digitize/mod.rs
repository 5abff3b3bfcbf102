pub mod image;
pub mod binarize;
pub mod denoise;
pub mod margin;
pub mod convergence;
pub mod grid;
pub mod separator;
pub mod segment;
pub mod pack;
pub mod digitizer;
