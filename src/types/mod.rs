mod row;
mod sql_value;

pub use row::{ColumnDescription, Row};
pub use sql_value::{BlobObject, SqlValue};
