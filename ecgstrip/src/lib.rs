pub mod error;
pub mod lead;
pub mod digitize;
