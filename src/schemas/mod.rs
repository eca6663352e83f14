pub mod user;
pub mod validation;

pub use validation::{is_valid_email, FieldReader, Patch};
