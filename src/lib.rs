//! skywatch library
//!
//! This module exposes the weather engine and its supporting modules for
//! use in integration tests.

pub mod aggregate;
pub mod cache;
pub mod cities;
pub mod classify;
pub mod cli;
pub mod data;
pub mod engine;
