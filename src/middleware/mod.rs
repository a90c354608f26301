pub mod admin_key;

pub use admin_key::{AdminKeyMiddleware, ADMIN_KEY_HEADER};
