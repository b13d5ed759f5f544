//! The configuration model ("values") of an SDAP deployment.
//!
//! Values are deserialized from a (layered, see [`layer`]) YAML tree. Every option either has an
//! explicit value or a default defined in the [`Default`] implementation of its struct, and unknown
//! options are rejected, so a misspelled option fails the composition instead of being ignored.
//!
//! The conditional parts of the model are exposed through typed accessors such as
//! [`Values::granule_storage`] which turn loosely related options into a single enum. Templates only
//! ever consume these accessors.
use std::{collections::BTreeMap, net::IpAddr, path::PathBuf, str::FromStr};

use serde::{Deserialize, Deserializer, de::Error as _};
use snafu::{ResultExt, Snafu};
use url::Url;

pub mod layer;
pub mod loader;
mod validation;

pub use validation::Error;

/// Deserializes values from an already layered YAML tree.
pub fn from_yaml_value(value: serde_yaml::Value) -> Result<Values, DeserializeError> {
    // Deserializing through `singleton_map_recursive` keeps enum handling consistent with how
    // manifests are serialized.
    serde_yaml::with::singleton_map_recursive::deserialize(value).context(DeserializeSnafu)
}

#[derive(Debug, Snafu)]
#[snafu(display("failed to deserialize values"))]
pub struct DeserializeError {
    source: serde_yaml::Error,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Values {
    pub release: Release,

    /// The storage class used for every claim this composition creates.
    pub storage_class: String,

    /// The address of an external OnEarth tile server. Empty disables the proxy.
    #[serde(rename = "onEarthProxyIP", deserialize_with = "empty_string_as_none")]
    pub on_earth_proxy_ip: Option<IpAddr>,

    pub root_webpage: RootWebpage,

    #[serde(rename = "insituAPI")]
    pub insitu_api: InsituApi,

    pub webapp: Webapp,
    pub ingress: Ingress,
    pub ingestion: Ingestion,
    pub rabbitmq: RabbitMq,
    pub cassandra: Cassandra,
    pub solr: Solr,
}

impl Default for Values {
    fn default() -> Self {
        Self {
            release: Release::default(),
            storage_class: "hostpath".to_owned(),
            on_earth_proxy_ip: None,
            root_webpage: RootWebpage::default(),
            insitu_api: InsituApi::default(),
            webapp: Webapp::default(),
            ingress: Ingress::default(),
            ingestion: Ingestion::default(),
            rabbitmq: RabbitMq::default(),
            cassandra: Cassandra::default(),
            solr: Solr::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Release {
    pub name: String,
    pub namespace: Option<String>,
}

impl Default for Release {
    fn default() -> Self {
        Self {
            name: "nexus".to_owned(),
            namespace: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RootWebpage {
    pub enabled: bool,
    #[serde(deserialize_with = "scalar_as_string")]
    pub image: String,
}

impl Default for RootWebpage {
    fn default() -> Self {
        Self {
            enabled: true,
            image: "nginx:stable-alpine".to_owned(),
        }
    }
}

/// The in-situ data API is deployed separately, the composition only routes to it.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct InsituApi {
    pub enabled: bool,
    pub service_name: String,
    pub port: u16,
}

impl Default for InsituApi {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "insitu-api".to_owned(),
            port: 8080,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Webapp {
    pub enabled: bool,

    /// The first path segment under which the analysis webapp is served, e.g. `nexus`.
    pub path_prefix: String,
    pub port: u16,
}

impl Default for Webapp {
    fn default() -> Self {
        Self {
            enabled: true,
            path_prefix: "nexus".to_owned(),
            port: 8083,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Ingress {
    pub enabled: bool,
    pub class_name: String,
    #[serde(deserialize_with = "optional_scalar_as_string")]
    pub host: Option<String>,

    /// Read and send timeout of every route.
    pub timeout_seconds: u32,
}

impl Default for Ingress {
    fn default() -> Self {
        Self {
            enabled: true,
            class_name: "nginx".to_owned(),
            host: None,
            timeout_seconds: 3600,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Ingestion {
    pub enabled: bool,
    pub granule_ingester: GranuleIngester,
    pub collection_manager: CollectionManager,
    pub config_operator: ConfigOperator,
    pub granules: Granules,
    pub collections: Collections,
    pub history: History,
}

impl Default for Ingestion {
    fn default() -> Self {
        Self {
            enabled: true,
            granule_ingester: GranuleIngester::default(),
            collection_manager: CollectionManager::default(),
            config_operator: ConfigOperator::default(),
            granules: Granules::default(),
            collections: Collections::default(),
            history: History::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GranuleIngester {
    pub replicas: u16,
    #[serde(deserialize_with = "scalar_as_string")]
    pub image: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub cpu: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub memory: String,
}

impl Default for GranuleIngester {
    fn default() -> Self {
        Self {
            replicas: 2,
            image: "nexusjpl/granule-ingester:1.0.0".to_owned(),
            cpu: "1".to_owned(),
            memory: "1Gi".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectionManager {
    #[serde(deserialize_with = "scalar_as_string")]
    pub image: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub cpu: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub memory: String,
}

impl Default for CollectionManager {
    fn default() -> Self {
        Self {
            image: "nexusjpl/collection-manager:1.0.0".to_owned(),
            cpu: "0.5".to_owned(),
            memory: "1Gi".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigOperator {
    #[serde(deserialize_with = "scalar_as_string")]
    pub image: String,
}

impl Default for ConfigOperator {
    fn default() -> Self {
        Self {
            image: "nexusjpl/config-operator:0.0.1".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Granules {
    /// The directory holding the granules, on the node or on the NFS server.
    pub path: PathBuf,

    /// Where the granule directory is mounted inside ingestion containers.
    pub mount_path: PathBuf,
    pub nfs_server: Option<String>,
    pub s3: S3,
}

impl Default for Granules {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/sdap/granules"),
            mount_path: PathBuf::from("/data"),
            nfs_server: None,
            s3: S3::default(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct S3 {
    #[serde(deserialize_with = "optional_scalar_as_string")]
    pub bucket: Option<String>,
    pub service_account_name: Option<String>,
    #[serde(deserialize_with = "scalar_values_as_strings")]
    pub aws_creds_envs: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Collections {
    /// The name of a pre-existing ConfigMap holding `collections.yml`.
    pub config_map: Option<String>,
    pub local_dir: Option<PathBuf>,
    pub git: Git,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Git {
    pub url: Option<Url>,
    #[serde(deserialize_with = "scalar_as_string")]
    pub branch: String,
    #[serde(deserialize_with = "optional_scalar_as_string")]
    pub token: Option<String>,
}

impl Default for Git {
    fn default() -> Self {
        Self {
            url: None,
            branch: "master".to_owned(),
            token: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct History {
    pub solr_enabled: bool,

    /// Requested size of the history claim, only used without Solr.
    #[serde(deserialize_with = "scalar_as_string")]
    pub storage: String,
}

impl Default for History {
    fn default() -> Self {
        Self {
            solr_enabled: true,
            storage: "1Gi".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RabbitMq {
    #[serde(deserialize_with = "scalar_as_string")]
    pub host: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub username: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub password: String,
}

impl Default for RabbitMq {
    fn default() -> Self {
        Self {
            host: "rabbitmq".to_owned(),
            username: "guest".to_owned(),
            password: "guest".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Cassandra {
    #[serde(deserialize_with = "scalar_as_string")]
    pub host: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub username: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub password: String,
}

impl Default for Cassandra {
    fn default() -> Self {
        Self {
            host: "cassandra".to_owned(),
            username: "cassandra".to_owned(),
            password: "cassandra".to_owned(),
        }
    }
}

/// Overrides for an external Solr. Without them the release's own Solr is used.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Solr {
    pub host_and_port: Option<String>,
    pub zookeeper_host_and_port: Option<String>,
}

/// Where ingested granules are read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GranuleStorage<'a> {
    ObjectStore { bucket: &'a str },
    Local(LocalStorage<'a>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalStorage<'a> {
    pub path: &'a str,
    pub mount_path: &'a str,
    pub nfs_server: Option<&'a str>,
}

/// How ingestion pods authenticate against the object store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource<'a> {
    /// The pod identity (e.g. IRSA) provides credentials, no secrets are passed explicitly.
    ServiceAccount { name: &'a str },
    Explicit { envs: &'a BTreeMap<String, String> },
}

/// Where the collection manager records which granules were already ingested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryBackend {
    SearchIndex,
    Filesystem,
}

/// Where the collections configuration (`collections.yml`) comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionsSource<'a> {
    /// A ConfigMap managed outside of this composition.
    ConfigMap { name: &'a str },
    Git {
        url: &'a Url,
        branch: &'a str,
        token: Option<&'a str>,
    },
    LocalDir { path: &'a str },
}

impl Values {
    /// Validates the values, see [`Error`] for the rules.
    pub fn validate(&self) -> Result<(), Error> {
        validation::validate(self)
    }

    pub fn granule_storage(&self) -> GranuleStorage<'_> {
        let granules = &self.ingestion.granules;
        match &granules.s3.bucket {
            Some(bucket) => GranuleStorage::ObjectStore { bucket },
            None => GranuleStorage::Local(LocalStorage {
                path: path_as_str(&granules.path),
                mount_path: path_as_str(&granules.mount_path),
                nfs_server: granules.nfs_server.as_deref(),
            }),
        }
    }

    /// The service account takes precedence, explicit credentials are ignored when both are given.
    pub fn credential_source(&self) -> CredentialSource<'_> {
        let s3 = &self.ingestion.granules.s3;
        match &s3.service_account_name {
            Some(name) => CredentialSource::ServiceAccount { name },
            None => CredentialSource::Explicit {
                envs: &s3.aws_creds_envs,
            },
        }
    }

    pub fn history_backend(&self) -> HistoryBackend {
        if self.ingestion.history.solr_enabled {
            HistoryBackend::SearchIndex
        } else {
            HistoryBackend::Filesystem
        }
    }

    /// Resolves the collections configuration source.
    ///
    /// Fails if the options do not describe exactly one source.
    pub fn collections_source(&self) -> Result<CollectionsSource<'_>, Error> {
        validation::collections_source(&self.ingestion.collections)
    }
}

/// Validation rejects paths which are not valid UTF-8.
fn path_as_str(path: &std::path::Path) -> &str {
    path.to_str().unwrap_or_default()
}

/// Accepts unquoted numbers and booleans where a string is expected, e.g. `--set
/// rabbitmq.password=1234`.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_to_string(serde_yaml::Value::deserialize(deserializer)?).map_err(D::Error::custom)
}

fn optional_scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(None),
        value => scalar_to_string(value).map(Some).map_err(D::Error::custom),
    }
}

fn scalar_values_as_strings<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, serde_yaml::Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| scalar_to_string(value).map(|value| (key, value)))
        .collect::<Result<_, _>>()
        .map_err(D::Error::custom)
}

fn scalar_to_string(value: serde_yaml::Value) -> Result<String, String> {
    match value {
        serde_yaml::Value::String(string) => Ok(string),
        serde_yaml::Value::Number(number) => Ok(number.to_string()),
        serde_yaml::Value::Bool(boolean) => Ok(boolean.to_string()),
        other => Err(format!("invalid type: {other:?}, expected a string")),
    }
}

fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = String::deserialize(deserializer)?;
    if value.is_empty() {
        Ok(None)
    } else {
        value.parse().map(Some).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn parse(yaml: &str) -> Result<Values, DeserializeError> {
        from_yaml_value(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn empty_document_uses_defaults() {
        let values = parse("{}").unwrap();
        assert_eq!(values, Values::default());
        assert_eq!(values.release.name, "nexus");
        assert!(values.ingestion.enabled);
        assert!(values.ingestion.history.solr_enabled);
        assert_eq!(values.ingestion.collections.git.branch, "master");
        assert_eq!(values.on_earth_proxy_ip, None);
    }

    #[test]
    fn camel_case_options() {
        let values = parse(indoc! {"
            onEarthProxyIP: 10.0.0.12
            insituAPI:
              enabled: false
            rootWebpage:
              enabled: false
            ingestion:
              granules:
                s3:
                  bucket: my-bucket
                  serviceAccountName: sa-1
              history:
                solrEnabled: false
        "})
        .unwrap();

        assert_eq!(
            values.on_earth_proxy_ip,
            Some("10.0.0.12".parse().unwrap())
        );
        assert!(!values.insitu_api.enabled);
        assert!(!values.root_webpage.enabled);
        assert_eq!(
            values.granule_storage(),
            GranuleStorage::ObjectStore {
                bucket: "my-bucket"
            }
        );
        assert_eq!(
            values.credential_source(),
            CredentialSource::ServiceAccount { name: "sa-1" }
        );
        assert_eq!(values.history_backend(), HistoryBackend::Filesystem);
    }

    #[test]
    fn empty_proxy_address_disables_proxy() {
        let values = parse("onEarthProxyIP: \"\"").unwrap();
        assert_eq!(values.on_earth_proxy_ip, None);
    }

    #[test]
    fn invalid_proxy_address_is_rejected() {
        assert!(parse("onEarthProxyIP: not-an-ip").is_err());
    }

    #[test]
    fn unquoted_scalars_are_strings() {
        let values = parse(indoc! {"
            rabbitmq:
              password: 1234
            cassandra:
              username: true
            ingestion:
              granuleIngester:
                cpu: 0.5
              granules:
                s3:
                  bucket: 2024
                  awsCredsEnvs:
                    AWS_ACCESS_KEY_ID: 42
        "})
        .unwrap();

        assert_eq!(values.rabbitmq.password, "1234");
        assert_eq!(values.cassandra.username, "true");
        assert_eq!(values.ingestion.granule_ingester.cpu, "0.5");
        assert_eq!(values.ingestion.granules.s3.bucket.as_deref(), Some("2024"));
        assert_eq!(
            values.ingestion.granules.s3.aws_creds_envs["AWS_ACCESS_KEY_ID"],
            "42"
        );
    }

    #[test]
    fn structured_value_for_string_option_is_rejected() {
        let error = parse("rabbitmq: {password: [1, 2]}").unwrap_err();
        let source = std::error::Error::source(&error).unwrap().to_string();
        assert!(source.contains("expected a string"), "{source}");
    }

    #[test]
    fn unknown_option_is_rejected() {
        let error = parse(indoc! {"
            ingestion:
              histroy:
                solrEnabled: false
        "})
        .unwrap_err();

        let source = std::error::Error::source(&error).unwrap().to_string();
        assert!(source.contains("histroy"), "{source}");
    }

    #[test]
    fn local_storage_by_default() {
        let values = Values::default();
        assert_eq!(
            values.granule_storage(),
            GranuleStorage::Local(LocalStorage {
                path: "/var/lib/sdap/granules",
                mount_path: "/data",
                nfs_server: None,
            })
        );
        assert_eq!(
            values.credential_source(),
            CredentialSource::Explicit {
                envs: &BTreeMap::new()
            }
        );
    }
}
