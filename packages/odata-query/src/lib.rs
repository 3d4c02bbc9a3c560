// src/lib.rs

pub mod compile;
pub mod driver;
pub mod error;
pub mod eval;
pub mod page;
pub mod predicate;
pub mod query;
pub mod transport;

// Re-export commonly used types for convenience
pub use compile::{BooleanFormat, FilterCompiler};
pub use driver::{cancellation, CancelHandle, Cancellation, ContinuationDriver, QueryResult};
pub use error::QueryError;
pub use eval::RecordEvaluator;
pub use page::Page;
pub use predicate::{
    field, lit, CallKind, CompareOp, Entity, Expr, FieldMap, FieldPath, Literal, LogicalOp,
};
pub use query::Query;
pub use transport::{HttpRequest, HttpResponse, Method, Transport};
