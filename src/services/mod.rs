pub mod activation;
pub mod catalog;
pub mod catalog_repository;
pub mod key_parser;
pub mod reconciliation;
pub mod storage;
pub mod sync_journal;
pub mod worker;
