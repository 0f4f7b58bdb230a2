//! SQLite-backed draft repository

pub mod sqlite_repo;

pub use sqlite_repo::SqliteRepository;
