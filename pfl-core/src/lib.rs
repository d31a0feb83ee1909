#![doc = "pfl-core: core logic library for the portagefilelist tools."]

//! This crate holds the data models and pipelines shared by the `pfl` collector
//! and the `e-file` query client. Transport (HTTP) and CLI concerns live in the
//! `pfl` crate, behind the traits in [`contract`].
//!
//! # Usage
//! Build a [`vardb::VarDb`], an [`contract::Uploader`] and a
//! [`runstate::RunStateStore`], then call [`synchronise::synchronise`].

pub mod archive;
pub mod atom;
pub mod candidates;
pub mod collect;
pub mod config;
pub mod contract;
pub mod describe;
pub mod error;
pub mod query;
pub mod repos;
pub mod runstate;
pub mod synchronise;
pub mod vardb;

pub use error::{PflError, Result};
