//! kinfin-client - an async client for the KinFin clustering-analysis server
//!
//! This crate provides the core functionality for the `kinfin` CLI, including:
//! - A typed API gateway client with a uniform response envelope
//! - A session store persisted across runs
//! - A polling coordinator tracking submitted analyses to completion
//!
//! # Architecture
//!
//! The client is a thin coordinator over the analysis server's REST API:
//! - submitting a configuration yields a server-assigned session id
//! - the session store is the single source of truth for known runs
//! - one polling loop per watched session checks run status at a fixed
//!   interval with a hard attempt ceiling; loops are isolated and
//!   individually cancellable

pub mod api;
pub mod client;
pub mod config;
pub mod poll;
pub mod query;
pub mod session;
pub mod validate;
