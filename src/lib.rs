// Library exports shared by the server binary, key generator and tests
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;
pub mod state;
