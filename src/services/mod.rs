pub mod access;
pub mod delivery;
pub mod memory;
pub mod metadata_store;
pub mod notifier;
pub mod share_service;
pub mod storage;
pub mod worker;
