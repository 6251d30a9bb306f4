//! Applies `--set` override expressions onto a loaded [`Document`].
use std::str::FromStr;

use serde_json::Value;
use snafu::{ResultExt, Snafu};
use tracing::instrument;

use crate::{
    document::{Document, ParsePathError, Path, PathApplyError},
    set::{self, Assignment},
};

/// Overrides address fields relative to this top-level field of the API model.
pub const OVERRIDE_ROOT: &str = "properties";

type Result<T, E = MergeError> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum MergeError {
    #[snafu(display("failed to parse override {index} ({expression:?})"))]
    MalformedOverride {
        source: set::ParseError,
        index: usize,
        expression: String,
    },

    #[snafu(display("failed to parse the path of override {index} ({assignment})"))]
    ParsePath {
        source: ParsePathError,
        index: usize,
        assignment: String,
    },

    #[snafu(display("failed to apply override {index} to {path:?}"))]
    ApplyOverride {
        source: PathApplyError,
        index: usize,
        path: String,
    },
}

/// A resolved override: the value to store and where to store it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patch {
    /// The path within the document, including the [`OVERRIDE_ROOT`].
    pub path: Path,
    pub value: Value,

    /// The position of the override expression this patch was parsed from.
    pub index: usize,
}

impl Patch {
    fn from_assignment(assignment: &Assignment, index: usize) -> Result<Self> {
        let path = Path::from_str(&assignment.path).context(ParsePathSnafu {
            index,
            assignment: assignment.to_string(),
        })?;

        Ok(Self {
            path: path.prepend_field(OVERRIDE_ROOT),
            value: Value::String(assignment.value.clone()),
            index,
        })
    }
}

/// Parses every override expression into patches, keeping the order in which
/// the expressions and their assignments were supplied.
pub fn parse_overrides(overrides: &[impl AsRef<str>]) -> Result<Vec<Patch>> {
    let mut patches = Vec::new();

    for (index, expression) in overrides.iter().enumerate() {
        let expression = expression.as_ref();
        let assignments = set::parse_expression(expression)
            .context(MalformedOverrideSnafu { index, expression })?;

        for assignment in &assignments {
            patches.push(Patch::from_assignment(assignment, index)?);
        }
    }

    Ok(patches)
}

/// Applies all `overrides` onto `document`.
///
/// Any malformed override or conflicting path aborts the whole merge, the
/// partially patched document is dropped in that case.
#[instrument(skip_all, fields(overrides = overrides.len()))]
pub fn merge_overrides(mut document: Document, overrides: &[impl AsRef<str>]) -> Result<Document> {
    let patches = parse_overrides(overrides)?;

    for patch in patches {
        tracing::debug!(path = %patch.path, index = patch.index, "applying override");
        document
            .set(&patch.path, patch.value)
            .with_context(|_| ApplyOverrideSnafu {
                index: patch.index,
                path: patch.path.to_string(),
            })?;
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;

    fn base_document() -> Document {
        let Value::Object(map) = json!({
            "apiVersion": "vlabs",
            "properties": {
                "masterProfile": {"count": 1, "dnsPrefix": "mycluster"},
                "agentPoolProfiles": [{"name": "agentpool1", "count": 3}],
                "linuxProfile": {
                    "adminUsername": "azureuser",
                    "ssh": {"publicKeys": [{"keyData": "ssh-rsa AAAA"}]}
                }
            }
        }) else {
            unreachable!()
        };
        Document::from(map)
    }

    fn get<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
        document.get(&Path::from_str(path).unwrap())
    }

    #[test]
    fn no_overrides_keeps_document() {
        let merged = merge_overrides(base_document(), &[] as &[&str]).unwrap();
        assert_eq!(merged, base_document());
    }

    #[test]
    fn single_expression_with_multiple_assignments() {
        let merged = merge_overrides(
            base_document(),
            &["masterProfile.count=3,linuxProfile.adminUsername=testuser"],
        )
        .unwrap();

        assert_eq!(get(&merged, "properties.masterProfile.count"), Some(&json!("3")));
        assert_eq!(
            get(&merged, "properties.linuxProfile.adminUsername"),
            Some(&json!("testuser"))
        );
    }

    #[test]
    fn multiple_expressions_apply_in_order() {
        let merged = merge_overrides(
            base_document(),
            &["masterProfile.count=3", "masterProfile.count=5"],
        )
        .unwrap();

        assert_eq!(get(&merged, "properties.masterProfile.count"), Some(&json!("5")));
    }

    #[test]
    fn array_element_override() {
        let merged = merge_overrides(base_document(), &["agentPoolProfiles[0].count=1"]).unwrap();

        assert_eq!(
            get(&merged, "properties.agentPoolProfiles[0]"),
            Some(&json!({"name": "agentpool1", "count": "1"}))
        );
    }

    #[test]
    fn quoted_values_with_delimiters() {
        let merged = merge_overrides(
            base_document(),
            &[r#"linuxProfile.ssh.publicKeys[0].keyData="ssh-rsa AAAAB3NO8b9== azureuser@cluster.local",servicePrincipalProfile.clientId="123a4321-c6eb-4b61-9d6f-7db123e14a7a",servicePrincipalProfile.secret="=#msRock5!t=""#],
        )
        .unwrap();

        assert_eq!(
            get(&merged, "properties.linuxProfile.ssh.publicKeys[0].keyData"),
            Some(&json!("ssh-rsa AAAAB3NO8b9== azureuser@cluster.local"))
        );
        assert_eq!(
            get(&merged, "properties.servicePrincipalProfile"),
            Some(&json!({
                "clientId": "123a4321-c6eb-4b61-9d6f-7db123e14a7a",
                "secret": "=#msRock5!t="
            }))
        );
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let overrides = [
            "agentPoolProfiles[1].name=agentpool2,agentPoolProfiles[1].count=2",
            "masterProfile.count=3",
        ];
        let once = merge_overrides(base_document(), &overrides).unwrap();
        let twice = merge_overrides(once.clone(), &overrides).unwrap();

        assert_eq!(
            serde_json::to_vec(&once).unwrap(),
            serde_json::to_vec(&twice).unwrap()
        );
    }

    #[test]
    fn malformed_override_reports_index() {
        let err = merge_overrides(base_document(), &["masterProfile.count=3", "broken"])
            .expect_err("second override is malformed");

        assert!(matches!(
            err,
            MergeError::MalformedOverride { index: 1, ref expression, .. } if expression == "broken"
        ));
    }

    #[test]
    fn invalid_path_reports_assignment() {
        let err = merge_overrides(base_document(), &["masterProfile..count=3"])
            .expect_err("path contains an empty segment");

        assert!(matches!(
            err,
            MergeError::ParsePath { index: 0, ref assignment, .. } if assignment == "masterProfile..count=3"
        ));
    }

    #[test]
    fn conflicting_path_reports_path() {
        let err = merge_overrides(
            base_document(),
            &["masterProfile.count=3", "agentPoolProfiles[5].count=1"],
        )
        .expect_err("index is out of range");

        assert_eq!(
            err,
            MergeError::ApplyOverride {
                source: PathApplyError::IndexOutOfRange {
                    path: "properties.agentPoolProfiles[5].count".to_owned(),
                    parent: "properties.agentPoolProfiles".to_owned(),
                    index: 5,
                    len: 1,
                },
                index: 1,
                path: "properties.agentPoolProfiles[5].count".to_owned(),
            }
        );
    }

    #[test]
    fn creates_missing_objects() {
        let merged = merge_overrides(Document::from(Map::new()), &["tags.team=infra"]).unwrap();
        assert_eq!(merged.as_value(), &json!({"properties": {"tags": {"team": "infra"}}}));
    }
}
