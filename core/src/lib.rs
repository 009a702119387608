pub mod aggregate;
pub mod error;
pub mod export;
pub mod history;
pub mod insight;
pub mod models;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod wire;
