// src/models.rs

pub mod compliance;
pub mod dashboard;
pub mod invoice;
pub mod payment_plan;
pub mod quality;
pub mod snapshot;
