pub mod error_printing;
pub mod types;
pub mod value;

pub use error_printing::render_errors;
pub use types::{AttrValue, FromAttr, Span};
pub use value::parse_value;
