// src/services/mod.rs

//! Portal operations built on top of the [`RecordStore`](crate::store::RecordStore).

pub mod account;
pub mod certificates;
pub mod exams;
