// Library exports for testing and modular access

pub mod capture;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod ui;
