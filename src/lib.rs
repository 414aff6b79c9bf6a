//! minefile - discovers mining technical reports in public filing registries,
//! extracts their economic and geological metrics, scores the extraction and
//! upserts one canonical record per project.
//!
//! The batch is assembled in [`pipeline::Pipeline`]; each stage lives in its
//! own module and can be used on its own.

#![allow(clippy::should_implement_trait)]

pub mod cli;
pub mod config;
pub mod discovery;
pub mod extract;
pub mod fetch;
pub mod http_client;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod rate_limit;
pub mod repository;
pub mod schema;
pub mod score;
