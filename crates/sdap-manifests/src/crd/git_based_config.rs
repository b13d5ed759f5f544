//! The `GitBasedConfig` custom resource, which is reconciled by the SDAP config operator.
//!
//! The operator fetches `collections.yml` from a git repository (or a directory on the node) and
//! materializes it into the ConfigMap named by `config-map`.
use std::io::Write;

use kube::{CustomResource, CustomResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{config::CollectionsSource, yaml};

/// Describes where the collections configuration lives and which ConfigMap it is written to.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "sdap.apache.org",
    version = "v1",
    kind = "GitBasedConfig",
    shortname = "gitcfg",
    namespaced,
    derive = "PartialEq",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "kebab-case")]
pub struct GitBasedConfigSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_url: Option<Url>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,

    /// Token used to clone private repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<String>,

    /// The ConfigMap the collections configuration is written to.
    pub config_map: String,
}

impl GitBasedConfigSpec {
    /// Builds the spec for a managed collections source.
    ///
    /// Returns [`None`] for [`CollectionsSource::ConfigMap`], which is not managed by the operator.
    pub fn from_source(source: &CollectionsSource<'_>, config_map: impl Into<String>) -> Option<Self> {
        let mut spec = Self {
            git_url: None,
            git_branch: None,
            git_token: None,
            local_dir: None,
            config_map: config_map.into(),
        };

        match source {
            CollectionsSource::ConfigMap { .. } => return None,
            CollectionsSource::Git { url, branch, token } => {
                spec.git_url = Some((*url).clone());
                spec.git_branch = Some((*branch).to_owned());
                spec.git_token = token.map(str::to_owned);
            }
            CollectionsSource::LocalDir { path } => spec.local_dir = Some((*path).to_owned()),
        }

        Some(spec)
    }
}

impl GitBasedConfig {
    /// Writes the CustomResourceDefinition as an explicit YAML document.
    pub fn write_yaml_schema(writer: impl Write) -> Result<(), yaml::Error> {
        yaml::serialize_to_explicit_document(writer, &Self::crd())
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn git_source_serializes_kebab_case() {
        let url = Url::parse("https://github.com/apache/sdap-ingester-config").unwrap();
        let spec = GitBasedConfigSpec::from_source(
            &CollectionsSource::Git {
                url: &url,
                branch: "master",
                token: None,
            },
            "collections-config",
        )
        .unwrap();

        assert_eq!(
            serde_yaml::to_string(&spec).unwrap(),
            indoc! {"
                git-url: https://github.com/apache/sdap-ingester-config
                git-branch: master
                config-map: collections-config
            "}
        );
    }

    #[test]
    fn local_dir_source() {
        let spec = GitBasedConfigSpec::from_source(
            &CollectionsSource::LocalDir {
                path: "/opt/collections",
            },
            "collections-config",
        )
        .unwrap();

        assert_eq!(spec.local_dir.as_deref(), Some("/opt/collections"));
        assert_eq!(spec.git_url, None);
    }

    #[test]
    fn config_map_source_is_not_managed() {
        assert_eq!(
            GitBasedConfigSpec::from_source(
                &CollectionsSource::ConfigMap {
                    name: "my-collections"
                },
                "my-collections"
            ),
            None
        );
    }

    #[test]
    fn crd_metadata() {
        let crd = GitBasedConfig::crd();
        assert_eq!(crd.metadata.name.as_deref(), Some("gitbasedconfigs.sdap.apache.org"));
        assert_eq!(crd.spec.group, "sdap.apache.org");
        assert_eq!(crd.spec.versions[0].name, "v1");
        assert_eq!(crd.spec.scope, "Namespaced");
    }

    #[test]
    fn yaml_schema_is_an_explicit_document() {
        let mut buf = Vec::new();
        GitBasedConfig::write_yaml_schema(&mut buf).unwrap();
        let schema = String::from_utf8(buf).unwrap();

        assert!(schema.starts_with("---\napiVersion: apiextensions.k8s.io/v1\nkind: CustomResourceDefinition\n"));
        assert!(schema.contains("config-map"));
    }
}
