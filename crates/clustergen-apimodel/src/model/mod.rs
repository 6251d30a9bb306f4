//! The typed API model.
//!
//! A patched [`Document`] is turned into an [`ApiModel`] using
//! [`ApiModel::from_document`], after which [`ApiModel::set_defaults`] fills in
//! every optional setting the user left out.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::{ResultExt, Snafu, ensure};
use tracing::instrument;

use crate::document::{Document, Path, Segment};

mod defaults;
mod lenient;

pub use defaults::*;

type Result<T, E = ModelError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum ModelError {
    #[snafu(display("failed to deserialize the API model"))]
    Deserialize { source: serde_json::Error },

    #[snafu(display(
        "the API model contains unknown fields: {fields}",
        fields = fields.join(", ")
    ))]
    UnknownFields { fields: Vec<String> },

    #[snafu(display("failed to serialize the API model"))]
    Serialize { source: serde_json::Error },
}

/// Controls how fields which are not part of the [`ApiModel`] schema are
/// treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownFieldPolicy {
    /// Unknown fields are dropped and logged as warnings.
    #[default]
    Ignore,

    /// Unknown fields fail deserialization with [`ModelError::UnknownFields`].
    Reject,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiModel {
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub api_version: String,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default, deserialize_with = "lenient::null_default")]
    pub properties: Properties,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub orchestrator_profile: OrchestratorProfile,

    #[serde(default, deserialize_with = "lenient::null_default")]
    pub master_profile: MasterProfile,

    #[serde(default, deserialize_with = "lenient::null_default")]
    pub agent_pool_profiles: Vec<AgentPoolProfile>,

    #[serde(default, deserialize_with = "lenient::null_default")]
    pub linux_profile: LinuxProfile,

    #[serde(default)]
    pub service_principal_profile: Option<ServicePrincipalProfile>,

    #[serde(default, deserialize_with = "lenient::null_default")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, strum::Display)]
pub enum OrchestratorType {
    Kubernetes,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorProfile {
    #[serde(default)]
    pub orchestrator_type: Option<OrchestratorType>,

    #[serde(default)]
    pub orchestrator_release: Option<String>,
}

/// Where the OS and data disks of a VM are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, strum::Display)]
pub enum StorageProfile {
    ManagedDisks,
    StorageAccount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, strum::Display)]
pub enum AvailabilityProfile {
    AvailabilitySet,
    VirtualMachineScaleSets,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterProfile {
    #[serde(default, deserialize_with = "lenient::option")]
    pub count: Option<u32>,

    #[serde(default, deserialize_with = "lenient::null_default")]
    pub dns_prefix: String,

    #[serde(default)]
    pub vm_size: Option<String>,

    #[serde(default, rename = "osDiskSizeGB", deserialize_with = "lenient::option")]
    pub os_disk_size_gb: Option<u32>,

    #[serde(default)]
    pub storage_profile: Option<StorageProfile>,

    #[serde(default)]
    pub availability_profile: Option<AvailabilityProfile>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProfile {
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub name: String,

    #[serde(default, deserialize_with = "lenient::option")]
    pub count: Option<u32>,

    #[serde(default)]
    pub vm_size: Option<String>,

    #[serde(default, rename = "osDiskSizeGB", deserialize_with = "lenient::option")]
    pub os_disk_size_gb: Option<u32>,

    #[serde(default)]
    pub storage_profile: Option<StorageProfile>,

    #[serde(default)]
    pub availability_profile: Option<AvailabilityProfile>,

    /// Additional Kubernetes labels placed on every node of the pool.
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub custom_node_labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxProfile {
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub admin_username: String,

    #[serde(default, deserialize_with = "lenient::null_default")]
    pub ssh: SshConfiguration,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfiguration {
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub public_keys: Vec<PublicKey>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub key_data: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalProfile {
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub client_id: String,

    #[serde(default, deserialize_with = "lenient::null_default")]
    pub secret: String,
}

impl ApiModel {
    /// Deserializes the model from a (patched) document.
    ///
    /// Fields not covered by the schema are handled according to `policy`.
    #[instrument(skip_all, fields(policy = ?policy))]
    pub fn from_document(document: &Document, policy: UnknownFieldPolicy) -> Result<Self> {
        let model = Self::deserialize(document.as_value()).context(DeserializeSnafu)?;

        // Every known field is serialized, so anything present in the
        // document but missing from the round-tripped model is unknown
        let known = model.to_value()?;
        let mut unknown = Vec::new();
        collect_unknown_fields(document.as_value(), &known, &mut Vec::new(), &mut unknown);

        match policy {
            UnknownFieldPolicy::Reject => {
                ensure!(unknown.is_empty(), UnknownFieldsSnafu { fields: unknown });
            }
            UnknownFieldPolicy::Ignore => {
                for field in &unknown {
                    tracing::warn!(field = %field, "ignoring unknown API model field");
                }
            }
        }

        Ok(model)
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).context(SerializeSnafu)
    }
}

fn collect_unknown_fields(
    document: &Value,
    known: &Value,
    segments: &mut Vec<Segment>,
    unknown: &mut Vec<String>,
) {
    match (document, known) {
        (Value::Object(document), Value::Object(known)) => {
            for (key, value) in document {
                segments.push(Segment::Field(key.clone()));
                match known.get(key) {
                    Some(known) => collect_unknown_fields(value, known, segments, unknown),
                    None => unknown.push(Path::new(segments.iter().cloned()).to_string()),
                }
                segments.pop();
            }
        }
        (Value::Array(document), Value::Array(known)) => {
            for (index, (value, known)) in document.iter().zip(known).enumerate() {
                segments.push(Segment::Index(index));
                collect_unknown_fields(value, known, segments, unknown);
                segments.pop();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{Map, json};

    use super::*;

    fn document(value: Value) -> Document {
        let Value::Object(map) = value else {
            panic!("document root must be an object")
        };
        Document::from(map)
    }

    #[test]
    fn deserializes_camel_case_fields() {
        let doc = document(json!({
            "apiVersion": "vlabs",
            "properties": {
                "orchestratorProfile": {"orchestratorType": "Kubernetes"},
                "masterProfile": {"count": 3, "dnsPrefix": "mycluster", "osDiskSizeGB": 128},
                "agentPoolProfiles": [{
                    "name": "agentpool1",
                    "count": "2",
                    "vmSize": "Standard_D2_v2",
                    "storageProfile": "StorageAccount",
                    "customNodeLabels": {"team": "infra"}
                }],
                "linuxProfile": {
                    "adminUsername": "azureuser",
                    "ssh": {"publicKeys": [{"keyData": "ssh-rsa AAAA"}]}
                }
            }
        }));

        let model = ApiModel::from_document(&doc, UnknownFieldPolicy::Reject).unwrap();
        let properties = &model.properties;

        assert_eq!(model.api_version, "vlabs");
        assert_eq!(
            properties.orchestrator_profile.orchestrator_type,
            Some(OrchestratorType::Kubernetes)
        );
        assert_eq!(properties.master_profile.count, Some(3));
        assert_eq!(properties.master_profile.os_disk_size_gb, Some(128));
        assert_eq!(properties.agent_pool_profiles[0].count, Some(2));
        assert_eq!(
            properties.agent_pool_profiles[0].storage_profile,
            Some(StorageProfile::StorageAccount)
        );
        assert_eq!(
            properties.agent_pool_profiles[0].custom_node_labels["team"],
            "infra"
        );
        assert_eq!(properties.linux_profile.ssh.public_keys[0].key_data, "ssh-rsa AAAA");
    }

    #[test]
    fn empty_document_deserializes_to_default() {
        let model = ApiModel::from_document(&Document::default(), UnknownFieldPolicy::Reject).unwrap();
        assert_eq!(model, ApiModel::default());
    }

    #[rstest]
    #[case::tags(json!({"properties": {"tags": null}}))]
    #[case::linux_profile(json!({"properties": {"linuxProfile": null}}))]
    #[case::agent_pool_profiles(json!({"properties": {"agentPoolProfiles": null}}))]
    #[case::master_profile(json!({"properties": {"masterProfile": null}}))]
    #[case::properties(json!({"apiVersion": null, "properties": null}))]
    #[case::nested(json!({"properties": {
        "linuxProfile": {"adminUsername": null, "ssh": {"publicKeys": null}},
        "agentPoolProfiles": [{"name": null, "customNodeLabels": null}]
    }}))]
    fn null_counts_as_absent(#[case] value: Value) {
        let model = ApiModel::from_document(&document(value.clone()), UnknownFieldPolicy::Reject)
            .unwrap_or_else(|err| panic!("{value} should deserialize, got {err:?}"));

        let mut expected = ApiModel::default();
        if let Some(pools) = value["properties"]["agentPoolProfiles"].as_array() {
            expected.properties.agent_pool_profiles = vec![AgentPoolProfile::default(); pools.len()];
        }
        assert_eq!(model, expected);
    }

    #[test]
    fn type_mismatch_fails() {
        let doc = document(json!({"properties": {"masterProfile": {"count": "three"}}}));
        let err = ApiModel::from_document(&doc, UnknownFieldPolicy::Ignore).unwrap_err();
        assert!(matches!(err, ModelError::Deserialize { .. }));
    }

    #[test]
    fn unsupported_storage_profile_fails() {
        let doc = document(json!({"properties": {"masterProfile": {"storageProfile": "Floppy"}}}));
        let err = ApiModel::from_document(&doc, UnknownFieldPolicy::Ignore).unwrap_err();
        assert!(matches!(err, ModelError::Deserialize { .. }));
    }

    #[test]
    fn unknown_fields_are_ignored_by_default() {
        let doc = document(json!({
            "apiVersion": "vlabs",
            "plan": "free",
            "properties": {"masterProfile": {"count": 1, "colour": "blue"}}
        }));

        let model = ApiModel::from_document(&doc, UnknownFieldPolicy::default()).unwrap();
        assert_eq!(model.properties.master_profile.count, Some(1));
    }

    #[test]
    fn unknown_fields_are_reported_with_their_path() {
        let doc = document(json!({
            "plan": "free",
            "properties": {
                "masterProfile": {"count": 1, "colour": "blue"},
                "agentPoolProfiles": [{"name": "a"}, {"name": "b", "zones": ["1"]}]
            }
        }));

        let err = ApiModel::from_document(&doc, UnknownFieldPolicy::Reject).unwrap_err();
        let ModelError::UnknownFields { fields } = err else {
            panic!("expected unknown fields, got {err:?}");
        };
        assert_eq!(
            fields,
            [
                "plan",
                "properties.masterProfile.colour",
                "properties.agentPoolProfiles[1].zones"
            ]
        );
    }

    #[test]
    fn free_form_maps_have_no_unknown_fields() {
        let doc = document(json!({
            "properties": {
                "tags": {"any": "thing"},
                "agentPoolProfiles": [{"name": "a", "customNodeLabels": {"x": "y"}}]
            }
        }));

        assert!(ApiModel::from_document(&doc, UnknownFieldPolicy::Reject).is_ok());
    }

    #[test]
    fn serializes_back_to_camel_case() {
        let model = ApiModel {
            api_version: "vlabs".to_owned(),
            ..Default::default()
        };
        let value = model.to_value().unwrap();

        assert_eq!(value["apiVersion"], json!("vlabs"));
        assert_eq!(value["properties"]["masterProfile"]["osDiskSizeGB"], Value::Null);
        assert_eq!(value["properties"]["tags"], Value::Object(Map::new()));
    }
}
