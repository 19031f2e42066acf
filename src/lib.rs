//! Lecture Notes Pipeline
//!
//! This library provides the core functionality for the lecture-notes system:
//! a durable task record store over S3-compatible object storage, an
//! at-least-once work queue with visibility timeouts, and the multi-stage
//! worker pipeline that turns a submitted lecture-video link into a
//! transcript, an extracted audio track and a PDF notes document.

pub mod app_state;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod services;
