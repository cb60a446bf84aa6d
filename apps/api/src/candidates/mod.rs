//! Candidates for a job and their pipeline status.

pub mod handlers;
pub mod repository;
