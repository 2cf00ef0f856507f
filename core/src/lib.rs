pub mod auth;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod firestore;
pub mod models;
pub mod service;
pub mod store;
pub mod view;
