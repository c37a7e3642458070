pub mod error;
pub mod types;
pub mod value;

pub use error::{Result, StoreError};
pub use types::{Attribute, EntitySchema, Record};
pub use value::{AttributeType, Value};
