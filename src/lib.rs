pub mod aggregate;
pub mod classify;
pub mod compare;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod report;
pub mod rollup;
pub mod store;

pub use aggregate::aggregate_question;
pub use classify::{classify, ClassificationRule, Classifier};
pub use compare::{compare_programs, ComparisonRequest};
pub use error::{Error, StoreError, ValidationError};
pub use rollup::program_stats;
pub use store::{MemoryStore, ResponseStore, SurveyLoader};
