mod annotate;
mod error;
pub(crate) mod types;

pub use annotate::Annotate;
pub use error::{AnnotateError, Result};
pub(crate) use types::DEFAULT_REGION_CAPACITY;
