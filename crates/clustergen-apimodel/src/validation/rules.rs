use std::{collections::BTreeSet, sync::LazyLock};

use const_format::concatcp;
use regex::Regex;
use snafu::{OptionExt, ensure};

use super::{ValidationError, ValidationSnafu, Validator, validate_dns_prefix};
use crate::{
    model::{AgentPoolProfile, ApiModel, LinuxProfile, StorageProfile},
    sku::{SkuCatalog, storage_account_type},
};

pub const SUPPORTED_API_VERSIONS: &[&str] = &["vlabs"];
pub const SUPPORTED_MASTER_COUNTS: &[u32] = &[1, 3, 5];
pub const AGENT_POOL_COUNT_RANGE: std::ops::RangeInclusive<u32> = 1..=1000;

const AGENT_POOL_NAME_MAX_LENGTH: usize = 12;
const AGENT_POOL_NAME_FMT: &str = concatcp!("[a-z][a-z0-9]{0,", AGENT_POOL_NAME_MAX_LENGTH - 1, "}");

const LABEL_NAME_MAX_LENGTH: usize = 63;
const LABEL_NAME_FMT: &str = "([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]";
const LABEL_PREFIX_MAX_LENGTH: usize = 253;
const RFC_1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";
const LABEL_PREFIX_FMT: &str = concatcp!(RFC_1123_LABEL_FMT, "(\\.", RFC_1123_LABEL_FMT, ")*");

static AGENT_POOL_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{AGENT_POOL_NAME_FMT}$")).expect("failed to compile agent pool name regex")
});

static LABEL_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{LABEL_NAME_FMT}$")).expect("failed to compile label name regex")
});

static LABEL_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{LABEL_PREFIX_FMT}$")).expect("failed to compile label prefix regex")
});

pub const API_VERSION_RULE: &str = "apiVersion";
pub const MASTER_COUNT_RULE: &str = "masterProfile.count";
pub const AGENT_POOL_NAME_RULE: &str = "agentPoolProfiles.name";
pub const AGENT_POOL_COUNT_RULE: &str = "agentPoolProfiles.count";
pub const ADMIN_USERNAME_RULE: &str = "linuxProfile.adminUsername";
pub const SSH_PUBLIC_KEYS_RULE: &str = "linuxProfile.ssh.publicKeys";
pub const NODE_LABEL_RULE: &str = "customNodeLabels";
pub const VM_SIZE_RULE: &str = "vmSize";

/// The rules registered by [`ValidatorSet::new`](super::ValidatorSet::new), in
/// the order they run.
pub(crate) fn builtin_rules() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(|model: &ApiModel, _: &SkuCatalog| validate_api_version(&model.api_version))
            as Box<dyn Validator>,
        Box::new(|model: &ApiModel, _: &SkuCatalog| {
            validate_dns_prefix(&model.properties.master_profile.dns_prefix)
        }),
        Box::new(|model: &ApiModel, _: &SkuCatalog| {
            validate_master_count(model.properties.master_profile.count)
        }),
        Box::new(|model: &ApiModel, _: &SkuCatalog| {
            validate_agent_pool_names(&model.properties.agent_pool_profiles)
        }),
        Box::new(|model: &ApiModel, _: &SkuCatalog| {
            model
                .properties
                .agent_pool_profiles
                .iter()
                .try_for_each(validate_agent_pool_count)
        }),
        Box::new(|model: &ApiModel, _: &SkuCatalog| {
            validate_linux_profile(&model.properties.linux_profile)
        }),
        Box::new(|model: &ApiModel, _: &SkuCatalog| {
            model
                .properties
                .agent_pool_profiles
                .iter()
                .flat_map(|pool| &pool.custom_node_labels)
                .try_for_each(|(key, value)| validate_node_label(key, value))
        }),
        Box::new(validate_storage_tiers),
    ]
}

pub fn validate_api_version(api_version: &str) -> Result<(), ValidationError> {
    ensure!(
        SUPPORTED_API_VERSIONS.contains(&api_version),
        ValidationSnafu {
            rule: API_VERSION_RULE,
            value: api_version,
            message: format!(
                "apiVersion {api_version:?} is not supported, supported versions are: {}",
                SUPPORTED_API_VERSIONS.join(", ")
            ),
        }
    );
    Ok(())
}

pub fn validate_master_count(count: Option<u32>) -> Result<(), ValidationError> {
    let count = count.context(ValidationSnafu {
        rule: MASTER_COUNT_RULE,
        value: "",
        message: "the master count is required",
    })?;

    ensure!(
        SUPPORTED_MASTER_COUNTS.contains(&count),
        ValidationSnafu {
            rule: MASTER_COUNT_RULE,
            value: count.to_string(),
            message: format!("the master count must be 1, 3 or 5, but was {count}"),
        }
    );
    Ok(())
}

pub fn validate_agent_pool_name(name: &str) -> Result<(), ValidationError> {
    ensure!(
        AGENT_POOL_NAME_REGEX.is_match(name),
        ValidationSnafu {
            rule: AGENT_POOL_NAME_RULE,
            value: name,
            message: format!(
                "agent pool name {name:?} is invalid, it must start with a lowercase letter, \
                contain only lowercase letters and numbers and be at most \
                {AGENT_POOL_NAME_MAX_LENGTH} characters long"
            ),
        }
    );
    Ok(())
}

/// Checks the format of every pool name and that no name is used twice.
pub fn validate_agent_pool_names(pools: &[AgentPoolProfile]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();

    for pool in pools {
        validate_agent_pool_name(&pool.name)?;
        ensure!(
            seen.insert(pool.name.as_str()),
            ValidationSnafu {
                rule: AGENT_POOL_NAME_RULE,
                value: &pool.name,
                message: format!("agent pool name {:?} is used more than once", pool.name),
            }
        );
    }

    Ok(())
}

pub fn validate_agent_pool_count(pool: &AgentPoolProfile) -> Result<(), ValidationError> {
    let count = pool.count.with_context(|| ValidationSnafu {
        rule: AGENT_POOL_COUNT_RULE,
        value: "",
        message: format!("the count of agent pool {:?} is required", pool.name),
    })?;

    ensure!(
        AGENT_POOL_COUNT_RANGE.contains(&count),
        ValidationSnafu {
            rule: AGENT_POOL_COUNT_RULE,
            value: count.to_string(),
            message: format!(
                "the count of agent pool {:?} must be between {} and {}, but was {count}",
                pool.name,
                AGENT_POOL_COUNT_RANGE.start(),
                AGENT_POOL_COUNT_RANGE.end()
            ),
        }
    );
    Ok(())
}

/// Checks that an admin user and at least one SSH public key are configured.
pub fn validate_linux_profile(profile: &LinuxProfile) -> Result<(), ValidationError> {
    ensure!(
        !profile.admin_username.trim().is_empty(),
        ValidationSnafu {
            rule: ADMIN_USERNAME_RULE,
            value: &profile.admin_username,
            message: "the admin username must not be empty",
        }
    );

    let keys = &profile.ssh.public_keys;
    ensure!(
        !keys.is_empty(),
        ValidationSnafu {
            rule: SSH_PUBLIC_KEYS_RULE,
            value: "",
            message: "at least one SSH public key is required",
        }
    );

    if let Some(index) = keys.iter().position(|key| key.key_data.trim().is_empty()) {
        return ValidationSnafu {
            rule: SSH_PUBLIC_KEYS_RULE,
            value: "",
            message: format!("SSH public key {index} has no key data"),
        }
        .fail();
    }

    Ok(())
}

/// Checks a Kubernetes node label, which consists of an optional DNS subdomain
/// prefix, a name and a possibly empty value: `[<PREFIX>/]<NAME>=<VALUE>`.
pub fn validate_node_label(key: &str, value: &str) -> Result<(), ValidationError> {
    let invalid_key = |reason: String| ValidationSnafu {
        rule: NODE_LABEL_RULE,
        value: key,
        message: format!("node label key {key:?} is invalid: {reason}"),
    };

    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        ensure!(
            prefix.len() <= LABEL_PREFIX_MAX_LENGTH && LABEL_PREFIX_REGEX.is_match(prefix),
            invalid_key(format!(
                "the prefix must be a lowercase DNS subdomain of at most \
                {LABEL_PREFIX_MAX_LENGTH} characters"
            ))
        );
    }

    ensure!(
        name.len() <= LABEL_NAME_MAX_LENGTH && LABEL_NAME_REGEX.is_match(name),
        invalid_key(label_name_requirements("the name"))
    );

    ensure!(
        value.is_empty() || (value.len() <= LABEL_NAME_MAX_LENGTH && LABEL_NAME_REGEX.is_match(value)),
        ValidationSnafu {
            rule: NODE_LABEL_RULE,
            value,
            message: format!(
                "value {value:?} of node label {key:?} is invalid: {}",
                label_name_requirements("a non-empty value")
            ),
        }
    );

    Ok(())
}

fn label_name_requirements(subject: &str) -> String {
    format!(
        "{subject} must be at most {LABEL_NAME_MAX_LENGTH} characters, consist of alphanumeric \
        characters, '-', '_' or '.' and start and end with an alphanumeric character"
    )
}

/// Checks that a storage tier can be selected for every VM backed by managed
/// disks.
pub fn validate_storage_tiers(model: &ApiModel, _catalog: &SkuCatalog) -> Result<(), ValidationError> {
    let master = &model.properties.master_profile;
    let vms = std::iter::once((master.vm_size.as_deref(), master.storage_profile)).chain(
        model
            .properties
            .agent_pool_profiles
            .iter()
            .map(|pool| (pool.vm_size.as_deref(), pool.storage_profile)),
    );

    for (vm_size, storage_profile) in vms {
        let (Some(vm_size), Some(StorageProfile::ManagedDisks)) = (vm_size, storage_profile) else {
            continue;
        };

        if let Err(err) = storage_account_type(vm_size) {
            return ValidationSnafu {
                rule: VM_SIZE_RULE,
                value: vm_size,
                message: format!("no managed disk storage tier can be selected: {err}"),
            }
            .fail();
        }
    }

    Ok(())
}
