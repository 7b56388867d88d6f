// src/lib.rs

pub mod db;
pub mod repositories;
pub mod auth;
pub mod http;
pub mod geo;
pub mod places;
pub mod services;
pub mod test_utils;

pub use db::Database;
pub use naturequest_common::error::Error;
pub use http::{DefaultHttpClient, HttpClient};
