#![doc = "The `taskbin` library crate."]
#![doc = ""]
#![doc = "This crate contains the core logic for the TaskBin backend: domain models,"]
#![doc = "authentication (password hashing, session tokens, middleware), the HTTP"]
#![doc = "route handlers, upload persistence, and error handling. It is used by the"]
#![doc = "main binary (`main.rs`) to construct and run the application."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod uploads;
