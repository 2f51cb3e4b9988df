//! Test suite model, builder and test-file loading

mod builder;
pub mod loader;
mod model;

pub use builder::{CaseOptions, SessionBuilder, SessionOptions, SuiteBuilder};
pub use model::{TestAction, TestCase, TestSession, TestSuite};
