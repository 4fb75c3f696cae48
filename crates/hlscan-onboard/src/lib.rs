pub mod applications;
pub mod batch;
pub mod driver;
pub mod ledger;
pub mod scanner;
pub mod timing;

pub use driver::{run, RunSummary};
