// src/common.rs

pub mod error;
pub mod numbers;
