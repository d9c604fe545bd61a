// src/models/mod.rs

pub mod rack;
pub mod warehouse;

pub use rack::*;
pub use warehouse::*;
