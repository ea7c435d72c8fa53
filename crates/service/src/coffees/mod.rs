//! Coffee catalog: three-layer architecture (domain, repository, service).
//!
//! The service receives its stores explicitly; `repo::seaorm` wires the
//! database-backed ones and `repository::mock` the in-memory ones.

pub mod domain;
pub mod dto;
pub mod repository;
pub mod repo;
pub mod service;

pub use service::CoffeesService;
