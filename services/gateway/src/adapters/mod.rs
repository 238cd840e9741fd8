pub mod extractor;
pub mod fs_store;
pub mod gateway_client;

pub use extractor::ProcessExtractor;
pub use fs_store::FsResultStore;
pub use gateway_client::HttpGateway;
