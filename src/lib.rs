// src/lib.rs

//! flatfinder: polls a listings page and emails new offers

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
