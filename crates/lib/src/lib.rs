//! hatskit-lib: Core logic for assembling HATS bundles
//!
//! This crate provides the pipeline that turns a component manifest into a
//! single distributable archive:
//! - `resolve`: maps component descriptors to concrete release assets, with a
//!   TTL cache, conditional revalidation and rate-limit backoff
//! - `fetch`: streams resolved assets to disk
//! - `steps`: the declarative file-placement steps run against each download
//! - `record`: the previous build record and the changelog against it
//! - `build`: build identity, the skip decision and the build run itself
//! - `package`: the final zip and its text summary

pub mod build;
pub mod consts;
pub mod fetch;
pub mod manifest;
pub mod package;
pub mod platform;
pub mod record;
pub mod resolve;
pub mod selection;
pub mod session;
pub mod settings;
pub mod steps;
pub mod util;
