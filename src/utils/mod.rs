pub mod advisory;
pub mod content_type;
pub mod validation;
