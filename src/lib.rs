//! Data-access and session layer for the Levant Events admin panel.
//!
//! Two store contracts, [`auth::services::SessionStore`] and
//! [`entities::services::EntityStore`], each with a local (storage area) and
//! a remote (hosted auth + tables) backend. The [`views`] module keeps list
//! projections in sync with them, and [`app`] exposes both over HTTP.

pub mod app;
pub mod auth;
pub mod config;
pub mod entities;
pub mod error;
pub mod remote;
pub mod state;
pub mod storage;
pub mod views;
