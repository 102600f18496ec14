//! Panel - admin backend for a WhatsApp AI-bot service
//!
//! Users, their WhatsApp numbers (agents), token usage, telemetry and
//! gateway-backed subscription payments behind a JSON API.

pub mod api;
pub mod auth;
pub mod config;
pub mod entity;
pub mod gateway;
pub mod signature;
pub mod subscription;
