#![doc = "bom-sync-core: pipeline that turns Smartsheet BOM attachments into one CSV."]

//! This crate holds the data model, workbook reader and pipeline stages.
//! Network clients live in the `bom-sync` binary crate and are reached
//! through the traits in [`contract`].
//!
//! # Usage
//! Build a [`synchronise::SynchroniseConfig`], pass a [`contract::SheetSource`]
//! and a [`contract::Uploader`] to [`synchronise::synchronise`].

pub mod contract;
pub mod enumerate;
pub mod error;
pub mod extract;
pub mod publish;
pub mod synchronise;
pub mod table;
pub mod transform;
pub mod xlsx;

pub use error::SyncError;
