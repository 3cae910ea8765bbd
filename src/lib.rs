//! Catalogue API - A REST API over an e-commerce product catalogue
//!
//! Products (standalone, parent and child), categories, typed attributes,
//! images and stock records, with price and availability computed by a
//! pluggable pricing strategy.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod pricing;
pub mod services;
