mod expr;
mod field_map;
mod literal;
mod path;

pub use expr::{field, lit, CallKind, CompareOp, Expr, LogicalOp};
pub use field_map::{Entity, FieldMap};
pub use literal::Literal;
pub use path::FieldPath;
