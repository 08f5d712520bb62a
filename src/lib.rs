pub mod config;
pub mod message;
pub mod poll;
pub mod rest;
pub mod store;
