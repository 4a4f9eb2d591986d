// Library exports for emigration_forecast

pub mod batcher;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod model;
pub mod normalization;
pub mod record;
pub mod sequence;
pub mod source;
pub mod store;
