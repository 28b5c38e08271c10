//! Demo Generator (C11): deterministically populates (and tears down) demo
//! patients/visits/observations for local exploration and screenshots,
//! without ever touching a random number generator.

pub mod cascade;
pub mod error;
pub mod generator;
pub mod report;
pub mod repos;

pub use cascade::delete_demo_patients;
pub use error::{DemoError, Result};
pub use generator::generate;
pub use report::DemoReport;
pub use repos::Repos;
