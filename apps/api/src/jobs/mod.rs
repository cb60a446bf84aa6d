//! Job postings: CRUD and the attached performance profile.

pub mod handlers;
pub mod repository;
