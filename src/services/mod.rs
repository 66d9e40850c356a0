pub mod compression;
pub mod orchestrator;
pub mod provisioner;
pub mod storage;
pub mod upload_pool;
