//! Deterministic string encodings of labels and key/value pairs, which get
//! embedded into generated artifacts.
use std::collections::BTreeMap;

use crate::model::AgentPoolProfile;

pub const ROLE_LABEL: &str = "kubernetes.io/role";
pub const MASTER_ROLE_LABEL: &str = "node-role.kubernetes.io/master";
pub const AGENT_ROLE_LABEL: &str = "node-role.kubernetes.io/agent";
pub const AGENT_POOL_LABEL: &str = "agentpool";
pub const CLUSTER_LABEL: &str = "kubernetes.azure.com/cluster";

/// Renders `pairs` as `\"key=value\", \"key=value\"`, sorted by key.
///
/// The surrounding quotes are escaped, so that the result can be placed inside
/// an already quoted string.
///
/// ```
/// use std::collections::HashMap;
/// use clustergen_apimodel::helpers::ordered_escaped_key_vals_string;
///
/// let pairs = HashMap::from([("yes", "please"), ("foo", "bar")]);
/// assert_eq!(
///     ordered_escaped_key_vals_string(pairs),
///     r#"\"foo=bar\", \"yes=please\""#
/// );
/// ```
pub fn ordered_escaped_key_vals_string<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let sorted = pairs
        .into_iter()
        .map(|(key, value)| (key.as_ref().to_owned(), value.as_ref().to_owned()))
        .collect::<BTreeMap<_, _>>();

    sorted
        .iter()
        .map(|(key, value)| format!(r#"\"{key}={value}\""#))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Node labels applied to master nodes.
pub fn master_kubernetes_labels(resource_group: &str) -> String {
    format!("{ROLE_LABEL}=master,{MASTER_ROLE_LABEL}=,{CLUSTER_LABEL}={resource_group}")
}

/// Node labels applied to the nodes of an agent pool.
///
/// The built-in labels come first, followed by the custom node labels of the
/// pool sorted by key.
pub fn agent_kubernetes_labels(profile: &AgentPoolProfile, resource_group: &str) -> String {
    let mut labels = vec![
        format!("{ROLE_LABEL}=agent"),
        format!("{AGENT_ROLE_LABEL}="),
        format!("{AGENT_POOL_LABEL}={name}", name = profile.name),
        format!("{CLUSTER_LABEL}={resource_group}"),
    ];

    // BTreeMap iteration is ordered by key
    labels.extend(
        profile
            .custom_node_labels
            .iter()
            .map(|(key, value)| format!("{key}={value}")),
    );

    labels.join(",")
}
