//! This crate turns a user supplied API model plus a list of command line
//! overrides into a fully validated, in-memory model which can be handed to an
//! artifact generator.
//!
//! The pipeline consists of the following stages:
//!
//! 1. [`loader`] reads the API model file into a generic [`Document`].
//! 2. [`merge`] parses every override expression using [`set`] and applies the
//!    resulting patches onto the document.
//! 3. [`model`] deserializes the patched document into the typed [`ApiModel`]
//!    and fills in defaults.
//! 4. [`validation`] runs the registered validators against the model.
//!
//! [`pipeline::Pipeline`] sequences all of them.
//!
//! ```no_run
//! use clustergen_apimodel::pipeline::{LoadOptions, Pipeline};
//!
//! let pipeline = Pipeline::new(LoadOptions::default());
//! let model = pipeline
//!     .run("kubernetes.json", &["masterProfile.count=3".to_owned()])
//!     .expect("valid API model");
//!
//! assert_eq!(model.properties.master_profile.count, Some(3));
//! ```

pub mod document;
pub mod generate;
pub mod helpers;
pub mod loader;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod set;
pub mod sku;
pub mod validation;

pub use document::Document;
pub use model::ApiModel;
