pub mod activity;
pub mod config;
pub mod export;
pub mod mutation;
pub mod retry;
pub mod scheduler;
pub mod server;
pub mod state;
pub mod store;
pub mod tree;
