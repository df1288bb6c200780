/// Data preparation: imputation, encoding, rebalancing

pub mod cleaning;
pub mod encoding;
pub mod rebalance;

pub use cleaning::{clean, ImputerState};
pub use encoding::BinaryEncoder;
pub use rebalance::RandomOversampler;
