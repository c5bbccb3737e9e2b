pub mod config;
pub mod credential_store;
pub mod error;
pub mod ledger_cache;
pub mod memory_store;
pub mod record_mapper;
pub mod storage;
pub mod store_client;
