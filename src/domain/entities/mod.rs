pub mod assignment;
pub mod attendant;
pub mod company;
pub mod distribution;
pub mod history;
pub mod metrics;
pub mod strategy;
pub mod sweep;

pub use assignment::*;
pub use attendant::*;
pub use company::*;
pub use distribution::*;
pub use history::*;
pub use metrics::*;
pub use strategy::*;
pub use sweep::*;
