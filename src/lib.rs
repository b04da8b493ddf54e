//! Library exports for the course administration backend
//!
//! This module exposes internal components for testing and for the
//! `dashboard` binary.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod error;
pub mod handler;
pub mod maintenance;
pub mod model;
pub mod route;
pub mod upload;
