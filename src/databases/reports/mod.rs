pub mod orders;
pub mod stats;
