// src/models/mod.rs

pub mod answer;
pub mod class;
pub mod evaluation;
pub mod exam;
pub mod grade;
pub mod question;
pub mod response;
pub mod user;
