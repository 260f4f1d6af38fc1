// src/handlers/mod.rs

pub mod answer;
pub mod auth;
pub mod class;
pub mod exam;
pub mod grade;
pub mod question;
pub mod response;
pub mod session;
pub mod user;
