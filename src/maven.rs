//! The Maven repository model: coordinates, repositories and their layouts, POMs and the local
//!  repository.

pub mod artifact_handler;
pub mod coordinates;
pub mod local_repo;
pub mod metadata_xml;
pub mod paths;
pub mod pom;
pub mod repository;
