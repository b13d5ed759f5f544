//! Turns validated values into a consistent [`Bundle`] of manifests.
//!
//! Rendering is followed by a consistency pass over the whole bundle, so a template which stops
//! agreeing with the [`DerivedValues`] (or with another template) fails the composition instead of
//! producing manifests which only break once applied.
use std::collections::{BTreeMap, BTreeSet};

use indexmap::{IndexMap, map::Entry};
use k8s_openapi::api::core::v1::{Container, PodSpec};
use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, info};

use crate::{
    config::{self, Values},
    derived::{COLLECTION_MANAGER_NAME, DerivedValues, GRANULE_INGESTER_NAME},
    manifest::{Identity, Manifest},
    selector::{self, LogicalResource},
    templates::{
        self,
        fragments::{COLLECTIONS_PATH_ENV, HISTORY_PATH_ENV, HISTORY_URL_ENV, S3_BUCKET_ENV},
    },
    yaml,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid configuration"))]
    InvalidConfig { source: config::Error },

    #[snafu(display("failed to render {resource}"))]
    RenderTemplate {
        source: templates::Error,
        resource: LogicalResource,
    },

    #[snafu(display("{identity} is rendered more than once with different content"))]
    ConflictingIdentity { identity: Identity },

    #[snafu(display(
        "{identity} uses {actual:?} as {value}, but every resource has to use {expected:?}"
    ))]
    DerivedValueMismatch {
        identity: Identity,
        value: &'static str,
        expected: String,
        actual: String,
    },

    #[snafu(display(
        "container {container:?} of {identity} must carry exactly one of {first} and {second}"
    ))]
    ExclusiveFragments {
        identity: Identity,
        container: String,
        first: &'static str,
        second: &'static str,
    },

    #[snafu(display("{identity} references {referenced}, which is not part of the bundle"))]
    MissingReferencedResource {
        identity: Identity,
        referenced: Identity,
    },

    #[snafu(display("failed to serialize the bundle"))]
    SerializeBundle { source: yaml::Error },
}

/// The ordered, de-duplicated manifests of a composition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bundle {
    manifests: Vec<Manifest>,
}

impl Bundle {
    pub fn iter(&self) -> impl Iterator<Item = &Manifest> {
        self.manifests.iter()
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    pub fn get(&self, kind: &str, name: &str) -> Option<&Manifest> {
        self.manifests
            .iter()
            .find(|manifest| manifest.kind() == kind && manifest.name() == name)
    }

    /// Serializes all manifests as explicit YAML documents, in bundle order.
    pub fn to_yaml(&self) -> Result<String> {
        yaml::to_explicit_documents_string(&self.manifests).context(SerializeBundleSnafu)
    }
}

impl<'a> IntoIterator for &'a Bundle {
    type IntoIter = std::slice::Iter<'a, Manifest>;
    type Item = &'a Manifest;

    fn into_iter(self) -> Self::IntoIter {
        self.manifests.iter()
    }
}

/// Composes the bundle for `values`.
///
/// Either every selected resource is rendered and the bundle is consistent, or an error is
/// returned. There are no partial bundles.
pub fn compose(values: &Values) -> Result<Bundle> {
    values.validate().context(InvalidConfigSnafu)?;

    let derived = DerivedValues::new(values);
    let selected = selector::select(values);

    let rendered = selected
        .iter()
        .map(|&resource| {
            debug!(%resource, "rendering resource");
            templates::render(resource, values, &derived)
                .context(RenderTemplateSnafu { resource })
        })
        .collect::<Result<Vec<_>>>()?;

    let manifests = deduplicate(rendered)?;
    verify_consistency(&manifests, values, &derived)?;

    info!(
        release = %derived.release_name,
        manifests = manifests.len(),
        "composed manifest bundle"
    );
    Ok(Bundle { manifests })
}

/// Collapses manifests with the same [`Identity`]. The first occurrence determines the position.
pub fn deduplicate(manifests: impl IntoIterator<Item = Manifest>) -> Result<Vec<Manifest>> {
    let mut unique = IndexMap::<Identity, Manifest>::new();

    for manifest in manifests {
        match unique.entry(manifest.identity()) {
            Entry::Occupied(existing) => {
                ensure!(
                    existing.get() == &manifest,
                    ConflictingIdentitySnafu {
                        identity: existing.key().clone()
                    }
                );
                debug!(identity = %existing.key(), "dropping identical duplicate");
            }
            Entry::Vacant(entry) => {
                entry.insert(manifest);
            }
        }
    }

    Ok(unique.into_values().collect())
}

/// Checks that all manifests agree with each other and with the derived values.
pub fn verify_consistency(
    manifests: &[Manifest],
    values: &Values,
    derived: &DerivedValues,
) -> Result<()> {
    let identities = manifests
        .iter()
        .map(Manifest::identity)
        .collect::<BTreeSet<_>>();

    for manifest in manifests {
        let identity = manifest.identity();

        if let Some(config) = manifest.as_git_based_config() {
            ensure_derived(
                &identity,
                "collections ConfigMap",
                &derived.collections_config_map,
                &config.spec.config_map,
            )?;
        }

        let Some(pod) = manifest
            .as_deployment()
            .and_then(|deployment| deployment.spec.as_ref())
            .and_then(|spec| spec.template.spec.as_ref())
        else {
            continue;
        };

        verify_pod(&identity, pod, &identities, values, derived)?;
    }

    Ok(())
}

fn verify_pod(
    identity: &Identity,
    pod: &PodSpec,
    identities: &BTreeSet<Identity>,
    values: &Values,
    derived: &DerivedValues,
) -> Result<()> {
    for volume in pod.volumes.iter().flatten() {
        if volume.name == derived.collections_volume_name {
            let config_map = volume
                .config_map
                .as_ref()
                .map(|config_map| config_map.name.as_str())
                .unwrap_or_default();
            ensure_derived(
                identity,
                "collections ConfigMap",
                &derived.collections_config_map,
                config_map,
            )?;
        }

        if let Some(claim) = &volume.persistent_volume_claim {
            let referenced = Identity {
                kind: "PersistentVolumeClaim",
                namespace: identity.namespace.clone(),
                name: claim.claim_name.clone(),
            };
            ensure!(
                identities.contains(&referenced),
                MissingReferencedResourceSnafu {
                    identity: identity.clone(),
                    referenced,
                }
            );
        }
    }

    let explicit_credentials = &values.ingestion.granules.s3.aws_creds_envs;

    for container in &pod.containers {
        let env = container
            .env
            .iter()
            .flatten()
            .map(|env| (env.name.as_str(), env.value.as_deref().unwrap_or_default()))
            .collect::<BTreeMap<_, _>>();
        let mounts = container
            .volume_mounts
            .iter()
            .flatten()
            .map(|mount| (mount.name.as_str(), mount.mount_path.as_str()))
            .collect::<BTreeMap<_, _>>();

        if let Some(mount_path) = mounts.get(derived.collections_volume_name.as_str()) {
            ensure_derived(
                identity,
                "collections mount path",
                &derived.collections_mount_path,
                mount_path,
            )?;
        }
        if let Some(collections_path) = env.get(COLLECTIONS_PATH_ENV) {
            ensure_derived(
                identity,
                COLLECTIONS_PATH_ENV,
                &derived.collections_file_path,
                collections_path,
            )?;
            ensure!(
                collections_path.starts_with(&format!("{}/", derived.collections_mount_path)),
                DerivedValueMismatchSnafu {
                    identity: identity.clone(),
                    value: "collections mount path",
                    expected: derived.collections_mount_path.clone(),
                    actual: *collections_path,
                }
            );
        }

        if let Some(history_path) = env.get(HISTORY_PATH_ENV) {
            ensure_derived(identity, HISTORY_PATH_ENV, &derived.history_mount_path, history_path)?;
            if let Some(mount_path) = mounts.get(derived.history_volume_name.as_str()) {
                ensure_derived(
                    identity,
                    "history mount path",
                    &derived.history_mount_path,
                    mount_path,
                )?;
            }
        }
        if let Some(history_url) = env.get(HISTORY_URL_ENV) {
            ensure_derived(identity, HISTORY_URL_ENV, &derived.solr_url, history_url)?;
        }

        let exclusive = |first: &'static str,
                         second: &'static str,
                         has_first: bool,
                         has_second: bool,
                         required: bool|
         -> Result<()> {
            let count = usize::from(has_first) + usize::from(has_second);
            ensure!(
                count == 1 || (count == 0 && !required),
                ExclusiveFragmentsSnafu {
                    identity: identity.clone(),
                    container: container.name.clone(),
                    first,
                    second,
                }
            );
            Ok(())
        };

        exclusive(
            HISTORY_URL_ENV,
            HISTORY_PATH_ENV,
            env.contains_key(HISTORY_URL_ENV),
            env.contains_key(HISTORY_PATH_ENV),
            false,
        )?;
        exclusive(
            S3_BUCKET_ENV,
            "the data volume",
            env.contains_key(S3_BUCKET_ENV),
            mounts.contains_key(derived.data_volume_name.as_str()),
            is_granule_consumer(container),
        )?;
        // Credential keys never name one of the pods' own env vars, see `RESERVED_ENV_NAMES`
        exclusive(
            "serviceAccountName",
            "explicit credentials",
            pod.service_account_name.is_some(),
            explicit_credentials
                .keys()
                .any(|key| env.contains_key(key.as_str())),
            false,
        )?;
    }

    Ok(())
}

fn is_granule_consumer(container: &Container) -> bool {
    container.name == COLLECTION_MANAGER_NAME || container.name == GRANULE_INGESTER_NAME
}

fn ensure_derived(
    identity: &Identity,
    value: &'static str,
    expected: &str,
    actual: &str,
) -> Result<()> {
    ensure!(
        expected == actual,
        DerivedValueMismatchSnafu {
            identity: identity.clone(),
            value,
            expected,
            actual,
        }
    );
    Ok(())
}
