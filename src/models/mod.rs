// src/models/mod.rs

pub mod certificate;
pub mod exam;
pub mod exam_response;
pub mod question;
pub mod user;
