//! Gazette - a small server-rendered blog
//!
//! Admins write articles, signed-in users comment on them, and anyone can
//! browse and search. State-changing requests are protected by CSRF tokens.

pub mod api;
pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod services;
pub mod views;
