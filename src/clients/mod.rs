pub mod backend_client;
pub mod storage_client;

pub use backend_client::BackendClient;
pub use storage_client::StorageClient;
