// src/models/mod.rs

pub mod assessment;
pub mod assignment;
pub mod notification;
pub mod question;
pub mod submission;
pub mod user;
