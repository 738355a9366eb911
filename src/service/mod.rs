pub mod ingestion;
pub mod normalizers;
pub mod repository;
