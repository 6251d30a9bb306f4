//! Writes the API model and the deployment parameters to disk.
use std::{
    fs,
    path::{Path, PathBuf},
};

use clustergen_apimodel::{
    generate::{ArtifactGenerator, GenerateRequest},
    helpers::{agent_kubernetes_labels, master_kubernetes_labels, ordered_escaped_key_vals_string},
    model::ModelError,
    sku::SkuCatalog,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use snafu::{ResultExt, Snafu};
use tracing::instrument;

pub const API_MODEL_FILE_NAME: &str = "apimodel.json";
pub const PARAMETERS_FILE_NAME: &str = "azuredeploy.parameters.json";

const PARAMETERS_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2015-01-01/deploymentParameters.json#";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to create output directory {path}", path = path.display()))]
    CreateOutputDirectory {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to read CA file {path}", path = path.display()))]
    ReadCaFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to convert the API model"))]
    ConvertModel { source: ModelError },

    #[snafu(display("failed to serialize {file_name}"))]
    SerializeArtifact {
        source: serde_json::Error,
        file_name: &'static str,
    },

    #[snafu(display("failed to write {path}", path = path.display()))]
    WriteArtifact {
        source: std::io::Error,
        path: PathBuf,
    },
}

/// An [`ArtifactGenerator`] which writes JSON files into the output directory.
#[derive(Debug)]
pub struct FileGenerator {
    catalog: SkuCatalog,
}

impl FileGenerator {
    pub fn new(catalog: SkuCatalog) -> Self {
        Self { catalog }
    }

    fn parameters(&self, request: &GenerateRequest) -> Result<Value> {
        let model = &request.model;
        let properties = &model.properties;
        let master = &properties.master_profile;
        // The cluster is deployed into a resource group named after it
        let resource_group = master.dns_prefix.as_str();

        let mut parameters = Map::new();
        let mut insert = |name: String, value: Value| {
            parameters.insert(name, json!({ "value": value }));
        };

        insert("dnsNamePrefix".to_owned(), json!(master.dns_prefix));
        if let Some(location) = &model.location {
            insert("location".to_owned(), json!(location));
        }
        insert("masterCount".to_owned(), json!(master.count));
        insert("masterVMSize".to_owned(), json!(master.vm_size));
        insert("masterOSDiskSizeGB".to_owned(), json!(master.os_disk_size_gb));
        insert(
            "masterNodeLabels".to_owned(),
            json!(master_kubernetes_labels(resource_group)),
        );

        for (pool, facts) in properties
            .agent_pool_profiles
            .iter()
            .zip(model.pool_facts(&self.catalog))
        {
            let name = &pool.name;
            insert(format!("{name}Count"), json!(pool.count));
            insert(format!("{name}VMSize"), json!(pool.vm_size));
            insert(format!("{name}OSDiskSizeGB"), json!(pool.os_disk_size_gb));
            insert(
                format!("{name}StorageAccountType"),
                json!(facts.storage_account_type),
            );
            insert(format!("{name}NvidiaEnabled"), json!(facts.nvidia_enabled));
            insert(format!("{name}SgxEnabled"), json!(facts.sgx_enabled));
            insert(
                format!("{name}NodeLabels"),
                json!(agent_kubernetes_labels(pool, resource_group)),
            );
        }

        let linux = &properties.linux_profile;
        insert("linuxAdminUsername".to_owned(), json!(linux.admin_username));
        if let Some(key) = linux.ssh.public_keys.first() {
            insert("sshRSAPublicKey".to_owned(), json!(key.key_data));
        }

        if let Some(service_principal) = &properties.service_principal_profile {
            insert(
                "servicePrincipalClientId".to_owned(),
                json!(service_principal.client_id),
            );
            insert(
                "servicePrincipalClientSecret".to_owned(),
                json!(service_principal.secret),
            );
        }

        if !properties.tags.is_empty() {
            insert(
                "clusterTags".to_owned(),
                json!(ordered_escaped_key_vals_string(&properties.tags)),
            );
        }

        if let Some(ca) = &request.ca {
            insert("caCertificate".to_owned(), json!(read_ca_file(&ca.certificate)?));
            insert("caPrivateKey".to_owned(), json!(read_ca_file(&ca.private_key)?));
        }

        Ok(json!({
            "$schema": PARAMETERS_SCHEMA,
            "contentVersion": "1.0.0.0",
            "parameters": parameters,
        }))
    }
}

impl ArtifactGenerator for FileGenerator {
    type Error = Error;

    #[instrument(skip_all, fields(output_directory = %request.output_directory.display()))]
    fn generate(&self, request: &GenerateRequest) -> Result<Vec<PathBuf>> {
        // Everything is rendered before the first file is written
        let parameters = self.parameters(request)?;
        let api_model = if request.parameters_only {
            None
        } else {
            Some(request.model.to_value().context(ConvertModelSnafu)?)
        };

        let directory = &request.output_directory;
        fs::create_dir_all(directory).context(CreateOutputDirectorySnafu { path: directory })?;

        let mut written = Vec::new();
        if let Some(api_model) = api_model {
            written.push(write_json(
                directory,
                API_MODEL_FILE_NAME,
                &api_model,
                request.pretty_print,
            )?);
        }
        written.push(write_json(
            directory,
            PARAMETERS_FILE_NAME,
            &parameters,
            request.pretty_print,
        )?);

        Ok(written)
    }
}

fn read_ca_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).context(ReadCaFileSnafu { path })
}

fn write_json(
    directory: &Path,
    file_name: &'static str,
    value: &impl Serialize,
    pretty_print: bool,
) -> Result<PathBuf> {
    let mut content = if pretty_print {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
    .context(SerializeArtifactSnafu { file_name })?;
    content.push(b'\n');

    let path = directory.join(file_name);
    fs::write(&path, content).context(WriteArtifactSnafu { path: &path })?;
    tracing::debug!(path = %path.display(), "wrote artifact");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use clustergen_apimodel::{
        generate::CaPaths,
        pipeline::{LoadOptions, Pipeline, ValidatedModel},
    };
    use rstest::rstest;

    use super::*;

    const SIMPLE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../clustergen-apimodel/testdata/simple/kubernetes.json"
    );

    fn model(overrides: &[&str]) -> ValidatedModel {
        Pipeline::new(LoadOptions::default())
            .run(SIMPLE, overrides)
            .unwrap()
    }

    fn read(path: &Path) -> Value {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_api_model_and_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let request = GenerateRequest::new(model(&["masterProfile.count=3"]))
            .with_output_directory(dir.path().join("out"));

        let written = FileGenerator::new(SkuCatalog::default())
            .generate(&request)
            .unwrap();

        assert_eq!(
            written,
            [
                dir.path().join("out").join(API_MODEL_FILE_NAME),
                dir.path().join("out").join(PARAMETERS_FILE_NAME)
            ]
        );

        let api_model = read(&written[0]);
        assert_eq!(api_model["properties"]["masterProfile"]["count"], json!(3));

        let parameters = read(&written[1]);
        let parameters = &parameters["parameters"];
        assert_eq!(parameters["dnsNamePrefix"]["value"], json!("simplecluster"));
        assert_eq!(parameters["masterCount"]["value"], json!(3));
        assert_eq!(
            parameters["agentpool1StorageAccountType"]["value"],
            json!("Premium_LRS")
        );
        assert_eq!(parameters["agentpool1NvidiaEnabled"]["value"], json!(false));
        assert_eq!(
            parameters["masterNodeLabels"]["value"],
            json!(
                "kubernetes.io/role=master,node-role.kubernetes.io/master=,kubernetes.azure.com/cluster=simplecluster"
            )
        );
        assert!(parameters.get("caCertificate").is_none());
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn pretty_print_output(#[case] pretty_print: bool) {
        let dir = tempfile::tempdir().unwrap();
        let request = GenerateRequest::new(model(&[]))
            .with_output_directory(dir.path())
            .with_pretty_print(pretty_print)
            .with_parameters_only(true);

        let written = FileGenerator::new(SkuCatalog::default())
            .generate(&request)
            .unwrap();

        assert_eq!(written, [dir.path().join(PARAMETERS_FILE_NAME)]);
        assert!(!dir.path().join(API_MODEL_FILE_NAME).exists());

        let content = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(content.lines().count() > 1, pretty_print);
    }

    #[test]
    fn embeds_ca_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let certificate = dir.path().join("ca.crt");
        let private_key = dir.path().join("ca.key");
        fs::write(&certificate, "CERTIFICATE").unwrap();
        fs::write(&private_key, "PRIVATE KEY").unwrap();

        let request = GenerateRequest::new(model(&["tags.yes=please,tags.foo=bar"]))
            .with_output_directory(dir.path().join("out"))
            .with_ca(Some(CaPaths {
                certificate,
                private_key,
            }))
            .with_parameters_only(true);

        let written = FileGenerator::new(SkuCatalog::default())
            .generate(&request)
            .unwrap();
        let parameters = read(&written[0]);
        let parameters = &parameters["parameters"];

        assert_eq!(parameters["caCertificate"]["value"], json!("CERTIFICATE"));
        assert_eq!(parameters["caPrivateKey"]["value"], json!("PRIVATE KEY"));
        assert_eq!(
            parameters["clusterTags"]["value"],
            json!(r#"\"foo=bar\", \"yes=please\""#)
        );
    }

    #[test]
    fn missing_ca_file_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output_directory = dir.path().join("out");
        let request = GenerateRequest::new(model(&[]))
            .with_output_directory(&output_directory)
            .with_ca(Some(CaPaths {
                certificate: dir.path().join("missing.crt"),
                private_key: dir.path().join("missing.key"),
            }));

        let err = FileGenerator::new(SkuCatalog::default())
            .generate(&request)
            .unwrap_err();

        assert!(matches!(err, Error::ReadCaFile { .. }));
        assert!(!output_directory.exists());
    }
}
