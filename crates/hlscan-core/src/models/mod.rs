pub mod application;
pub mod mapping;
pub mod processing;
pub mod repository;
