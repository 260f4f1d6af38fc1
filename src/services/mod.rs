// src/services/mod.rs

pub mod correction;
pub mod notify;
pub mod session;
pub mod store;
