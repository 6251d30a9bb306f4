//! Sequences loading, merging, deserialization, defaulting and validation.
use std::{ops::Deref, path::Path};

use serde::Serialize;
use snafu::{ResultExt, Snafu};
use tracing::instrument;

use crate::{
    loader::{self, LoadError},
    merge::{self, MergeError},
    model::{ApiModel, ModelError, StorageProfile, UnknownFieldPolicy},
    sku::{SkuCatalog, StorageAccountType, storage_account_type},
    validation::{ValidationError, ValidatorSet},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to load the API model"))]
    Load { source: LoadError },

    #[snafu(display("failed to merge overrides into the API model"))]
    Merge { source: MergeError },

    #[snafu(display("failed to build the typed API model"))]
    Model { source: ModelError },

    #[snafu(display("the API model is invalid"))]
    Validate { source: ValidationError },
}

/// Settings which control how an API model is loaded.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub unknown_fields: UnknownFieldPolicy,
    pub sku_catalog: SkuCatalog,
}

/// Turns an API model file plus overrides into a [`ValidatedModel`].
#[derive(Debug)]
pub struct Pipeline {
    unknown_fields: UnknownFieldPolicy,
    validators: ValidatorSet,
}

impl Pipeline {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            unknown_fields: options.unknown_fields,
            validators: ValidatorSet::new(options.sku_catalog),
        }
    }

    /// Replaces the built-in validators.
    pub fn with_validators(mut self, validators: ValidatorSet) -> Self {
        self.validators = validators;
        self
    }

    pub fn catalog(&self) -> &SkuCatalog {
        self.validators.catalog()
    }

    /// Runs all stages on the API model at `api_model_path`. The first failing
    /// stage aborts the run.
    #[instrument(skip_all, fields(api_model = %api_model_path.as_ref().display()))]
    pub fn run(
        &self,
        api_model_path: impl AsRef<Path>,
        overrides: &[impl AsRef<str>],
    ) -> Result<ValidatedModel> {
        let document = loader::load_document(api_model_path).context(LoadSnafu)?;
        let document = merge::merge_overrides(document, overrides).context(MergeSnafu)?;

        let mut model =
            ApiModel::from_document(&document, self.unknown_fields).context(ModelSnafu)?;
        model.set_defaults();

        self.validators.validate(&model).context(ValidateSnafu)?;
        tracing::info!(
            dns_prefix = %model.properties.master_profile.dns_prefix,
            agent_pools = model.properties.agent_pool_profiles.len(),
            "API model is valid"
        );

        Ok(ValidatedModel(model))
    }
}

/// An [`ApiModel`] which passed every validator. It can only be read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidatedModel(ApiModel);

impl Deref for ValidatedModel {
    type Target = ApiModel;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Hardware facts about an agent pool, derived from its VM size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolFacts {
    pub name: String,

    /// Only set for pools backed by managed disks.
    pub storage_account_type: Option<StorageAccountType>,
    pub nvidia_enabled: bool,
    pub sgx_enabled: bool,
}

impl ValidatedModel {
    pub fn into_inner(self) -> ApiModel {
        self.0
    }

    pub fn pool_facts(&self, catalog: &SkuCatalog) -> Vec<PoolFacts> {
        self.properties
            .agent_pool_profiles
            .iter()
            .map(|pool| {
                let vm_size = pool.vm_size.as_deref().unwrap_or_default();
                let storage_tier = match pool.storage_profile {
                    Some(StorageProfile::ManagedDisks) => storage_account_type(vm_size).ok(),
                    _ => None,
                };

                PoolFacts {
                    name: pool.name.clone(),
                    storage_account_type: storage_tier,
                    nvidia_enabled: catalog.is_nvidia_enabled_sku(vm_size),
                    sgx_enabled: catalog.is_sgx_enabled_sku(vm_size),
                }
            })
            .collect()
    }
}
