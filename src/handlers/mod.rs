// src/handlers/mod.rs

pub mod auth;
pub mod certificates;
pub mod exams;
pub mod user;
