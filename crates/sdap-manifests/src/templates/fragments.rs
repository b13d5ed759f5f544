//! Pieces of pod configuration shared between the collection manager and the granule ingester.
//!
//! Each option with alternative branches (credentials, history backend, granule storage) maps to
//! exactly one [`PodFragment`], so a pod can never carry two branches at once.
use k8s_openapi::api::core::v1::{EnvVar, Volume, VolumeMount};
use snafu::ResultExt;

use crate::{
    builder::pod::{PodBuilder, container::ContainerBuilder, volume::VolumeBuilder},
    config::{CredentialSource, GranuleStorage, HistoryBackend},
    derived::DerivedValues,
    templates::{BuildContainerSnafu, BuildPodTemplateSnafu, Result},
};

pub const COLLECTIONS_PATH_ENV: &str = "COLLECTIONS_PATH";
pub const HISTORY_URL_ENV: &str = "HISTORY_URL";
pub const HISTORY_PATH_ENV: &str = "HISTORY_PATH";
pub const S3_BUCKET_ENV: &str = "S3_BUCKET";

pub const RABBITMQ_USERNAME_ENV: &str = "RABBITMQ_USERNAME";
pub const RABBITMQ_PASSWORD_ENV: &str = "RABBITMQ_PASSWORD";
pub const RABBITMQ_HOST_ENV: &str = "RABBITMQ_HOST";
pub const CASSANDRA_CONTACT_POINTS_ENV: &str = "CASSANDRA_CONTACT_POINTS";
pub const CASSANDRA_USERNAME_ENV: &str = "CASSANDRA_USERNAME";
pub const CASSANDRA_PASSWORD_ENV: &str = "CASSANDRA_PASSWORD";
pub const SOLR_HOST_AND_PORT_ENV: &str = "SOLR_HOST_AND_PORT";
pub const ZK_HOST_AND_PORT_ENV: &str = "ZK_HOST_AND_PORT";

/// Env vars set by the ingestion templates themselves. Explicit credentials must not reuse them.
pub const RESERVED_ENV_NAMES: &[&str] = &[
    COLLECTIONS_PATH_ENV,
    HISTORY_URL_ENV,
    HISTORY_PATH_ENV,
    S3_BUCKET_ENV,
    RABBITMQ_USERNAME_ENV,
    RABBITMQ_PASSWORD_ENV,
    RABBITMQ_HOST_ENV,
    CASSANDRA_CONTACT_POINTS_ENV,
    CASSANDRA_USERNAME_ENV,
    CASSANDRA_PASSWORD_ENV,
    SOLR_HOST_AND_PORT_ENV,
    ZK_HOST_AND_PORT_ENV,
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PodFragment {
    pub env: Vec<EnvVar>,
    pub volumes: Vec<Volume>,
    pub volume_mounts: Vec<VolumeMount>,
    pub service_account_name: Option<String>,
}

impl PodFragment {
    fn with_env(mut self, name: &str, value: impl Into<String>) -> Self {
        self.env.push(env_var(name, value));
        self
    }

    fn with_volume(mut self, volume: Volume, mount_path: impl Into<String>) -> Self {
        self.volume_mounts.push(VolumeMount {
            name: volume.name.clone(),
            mount_path: mount_path.into(),
            ..VolumeMount::default()
        });
        self.volumes.push(volume);
        self
    }

    /// Adds the fragment to a pod and the given container of that pod.
    pub fn apply_to(
        self,
        pod_builder: &mut PodBuilder,
        container_builder: &mut ContainerBuilder,
        container_name: &str,
        pod_name: &str,
    ) -> Result<()> {
        container_builder
            .add_env_vars(self.env)
            .add_volume_mounts(self.volume_mounts)
            .context(BuildContainerSnafu { container_name })?;
        pod_builder
            .add_volumes(self.volumes)
            .context(BuildPodTemplateSnafu { name: pod_name })?;
        if let Some(service_account_name) = self.service_account_name {
            pod_builder.service_account_name(service_account_name);
        }
        Ok(())
    }
}

pub fn env_var(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_owned(),
        value: Some(value.into()),
        ..EnvVar::default()
    }
}

/// Object store credentials: either a pod identity or one env var per configured key, sorted by
/// key.
pub fn credentials(source: CredentialSource<'_>) -> PodFragment {
    match source {
        CredentialSource::ServiceAccount { name } => PodFragment {
            service_account_name: Some(name.to_owned()),
            ..PodFragment::default()
        },
        CredentialSource::Explicit { envs } => PodFragment {
            env: envs
                .iter()
                .map(|(name, value)| env_var(name, value.as_str()))
                .collect(),
            ..PodFragment::default()
        },
    }
}

pub fn history(backend: HistoryBackend, derived: &DerivedValues) -> PodFragment {
    match backend {
        HistoryBackend::SearchIndex => {
            PodFragment::default().with_env(HISTORY_URL_ENV, derived.solr_url.as_str())
        }
        HistoryBackend::Filesystem => PodFragment::default()
            .with_env(HISTORY_PATH_ENV, derived.history_mount_path.as_str())
            .with_volume(
                VolumeBuilder::new(&derived.history_volume_name)
                    .with_persistent_volume_claim(&derived.history_claim_name, false)
                    .build(),
                &derived.history_mount_path,
            ),
    }
}

/// Granules are either read from a bucket or from a volume mounted into the pod.
pub fn granule_storage(storage: GranuleStorage<'_>, derived: &DerivedValues) -> PodFragment {
    match storage {
        GranuleStorage::ObjectStore { bucket } => {
            PodFragment::default().with_env(S3_BUCKET_ENV, bucket)
        }
        GranuleStorage::Local(local) => {
            let mut volume_builder = VolumeBuilder::new(&derived.data_volume_name);
            match local.nfs_server {
                Some(server) => volume_builder.with_nfs(server, local.path),
                None => volume_builder.with_host_path(local.path, Some("DirectoryOrCreate")),
            };
            PodFragment::default().with_volume(volume_builder.build(), local.mount_path)
        }
    }
}

/// The collections configuration, mounted from the ConfigMap holding `collections.yml`.
pub fn collections_config(derived: &DerivedValues) -> PodFragment {
    PodFragment::default()
        .with_env(COLLECTIONS_PATH_ENV, derived.collections_file_path.as_str())
        .with_volume(
            VolumeBuilder::new(&derived.collections_volume_name)
                .with_config_map(&derived.collections_config_map)
                .build(),
            &derived.collections_mount_path,
        )
}
