use indexmap::IndexMap;
use k8s_openapi::{
    api::core::v1::{Container, PodSpec, PodTemplateSpec, Volume},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use snafu::Snafu;

use crate::builder::meta::ObjectMetaBuilder;

pub mod container;
pub mod volume;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display(
        "colliding volume name {colliding_volume_name:?} in volumes with different content"
    ))]
    VolumeNameCollision { colliding_volume_name: String },

    #[snafu(display("pod template needs at least one container"))]
    NoContainers,
}

/// A builder to build [`PodTemplateSpec`] objects.
///
/// Volumes are kept in an [`IndexMap`] so they are emitted in insertion order (logically grouped
/// volumes stay next to each other) while still being unique by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PodBuilder {
    containers: Vec<Container>,
    metadata: Option<ObjectMeta>,

    /// The key is the volume name.
    volumes: IndexMap<String, Volume>,
    service_account_name: Option<String>,
    restart_policy: Option<String>,
}

impl PodBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service_account_name(&mut self, value: impl Into<String>) -> &mut Self {
        self.service_account_name = Some(value.into());
        self
    }

    pub fn metadata_builder<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut ObjectMetaBuilder) -> &mut ObjectMetaBuilder,
    {
        let mut builder = ObjectMetaBuilder::new();
        let builder = f(&mut builder);
        self.metadata = Some(builder.build());
        self
    }

    pub fn restart_policy(&mut self, restart_policy: impl Into<String>) -> &mut Self {
        self.restart_policy = Some(restart_policy.into());
        self
    }

    pub fn add_container(&mut self, container: Container) -> &mut Self {
        self.containers.push(container);
        self
    }

    /// Adds a [`Volume`] to the pod.
    ///
    /// Adding the same volume twice is a no-op, adding a different volume with an already taken
    /// name fails.
    pub fn add_volume(&mut self, volume: Volume) -> Result<&mut Self> {
        if let Some(existing_volume) = self.volumes.get(&volume.name) {
            if existing_volume != &volume {
                return VolumeNameCollisionSnafu {
                    colliding_volume_name: volume.name,
                }
                .fail();
            }
        } else {
            self.volumes.insert(volume.name.clone(), volume);
        }

        Ok(self)
    }

    pub fn add_volumes(&mut self, volumes: impl IntoIterator<Item = Volume>) -> Result<&mut Self> {
        for volume in volumes {
            self.add_volume(volume)?;
        }
        Ok(self)
    }

    pub fn build_template(&self) -> Result<PodTemplateSpec> {
        if self.containers.is_empty() {
            return NoContainersSnafu.fail();
        }

        let volumes = if self.volumes.is_empty() {
            None
        } else {
            Some(self.volumes.values().cloned().collect())
        };

        Ok(PodTemplateSpec {
            metadata: self.metadata.clone(),
            spec: Some(PodSpec {
                containers: self.containers.clone(),
                volumes,
                service_account_name: self.service_account_name.clone(),
                restart_policy: self.restart_policy.clone(),
                ..PodSpec::default()
            }),
        })
    }
}
