#![allow(dead_code, unused_imports)]
pub mod clock;
pub mod faulty_store;
pub mod fixtures;
pub mod test_db;

pub use clock::*;
pub use faulty_store::*;
pub use fixtures::*;
pub use test_db::*;
