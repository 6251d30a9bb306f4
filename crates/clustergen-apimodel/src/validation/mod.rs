//! Semantic checks which gate artifact generation.
//!
//! Every rule is a pure function of the [`ApiModel`] and the injected
//! [`SkuCatalog`]. Rules are collected in a [`ValidatorSet`], which either
//! stops at the first failure ([`ValidatorSet::validate`]) or reports all of
//! them ([`ValidatorSet::validate_all`]).
use std::fmt::Display;

use snafu::Snafu;

use crate::{model::ApiModel, sku::SkuCatalog};

mod dns;
mod rules;

pub use dns::*;
pub use rules::*;

/// A named rule rejected the model.
#[derive(Debug, PartialEq, Eq, Snafu)]
#[snafu(display("validation rule {rule:?} failed: {message}"))]
pub struct ValidationError {
    /// The name of the rule, usually the name of the validated field.
    pub rule: &'static str,

    /// The offending value.
    pub value: String,
    pub message: String,
}

/// A collection of errors discovered by [`ValidatorSet::validate_all`].
#[derive(Debug, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.0
    }
}

/// A single check run against the finalized model.
///
/// Implemented for every `Fn(&ApiModel, &SkuCatalog) -> Result<(), ValidationError>`.
pub trait Validator {
    fn validate(&self, model: &ApiModel, catalog: &SkuCatalog) -> Result<(), ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&ApiModel, &SkuCatalog) -> Result<(), ValidationError>,
{
    fn validate(&self, model: &ApiModel, catalog: &SkuCatalog) -> Result<(), ValidationError> {
        self(model, catalog)
    }
}

/// An ordered registry of [`Validator`]s sharing one [`SkuCatalog`].
pub struct ValidatorSet {
    catalog: SkuCatalog,
    validators: Vec<Box<dyn Validator>>,
}

impl ValidatorSet {
    /// Creates a set containing all built-in rules.
    pub fn new(catalog: SkuCatalog) -> Self {
        let mut set = Self::empty(catalog);
        set.validators.extend(rules::builtin_rules());
        set
    }

    /// Creates a set without any rules.
    pub fn empty(catalog: SkuCatalog) -> Self {
        Self {
            catalog,
            validators: Vec::new(),
        }
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn catalog(&self) -> &SkuCatalog {
        &self.catalog
    }

    /// Runs the validators in order and returns the first failure.
    pub fn validate(&self, model: &ApiModel) -> Result<(), ValidationError> {
        self.validators
            .iter()
            .try_for_each(|validator| validator.validate(model, &self.catalog))
    }

    /// Runs every validator and returns all failures.
    pub fn validate_all(&self, model: &ApiModel) -> Result<(), ValidationErrors> {
        let errors = self
            .validators
            .iter()
            .filter_map(|validator| validator.validate(model, &self.catalog).err())
            .collect::<Vec<_>>();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

impl Default for ValidatorSet {
    fn default() -> Self {
        Self::new(SkuCatalog::default())
    }
}

impl std::fmt::Debug for ValidatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorSet")
            .field("catalog", &self.catalog)
            .field("validators", &self.validators.len())
            .finish()
    }
}
