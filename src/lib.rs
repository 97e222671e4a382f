//! Drill Routine Judge Service
//!
//! This library provides the core functionality for the drill-judge system:
//! an asynchronous pipeline that samples still frames from an uploaded
//! routine video, submits them to a multimodal judge model, and tracks each
//! assessment as a pollable job.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
