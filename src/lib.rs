// src/lib.rs

//! unisearch: item and university directory over a search index

pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod storage;
pub mod utils;
