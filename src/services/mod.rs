pub mod document_api;
pub mod object_store;
pub mod validator;

pub use document_api::DocumentApi;
pub use object_store::{ObjectStore, ProgressFn};
pub use validator::{validate_file, validate_title};
