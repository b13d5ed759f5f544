use std::collections::BTreeMap;

use indexmap::IndexMap;
use k8s_openapi::{
    api::core::v1::{Container, ContainerPort, EnvVar, ResourceRequirements, VolumeMount},
    apimachinery::pkg::api::resource::Quantity,
};
use snafu::Snafu;

use crate::validation::is_rfc_1123_label;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("container name {container_name:?} is invalid: {violation}"))]
    InvalidContainerName {
        container_name: String,
        violation: String,
    },

    #[snafu(display(
        "colliding mountPath {mount_path:?} in volumeMounts with different content, existing volume name {existing_volume_name:?}, new volume name {new_volume_name:?}"
    ))]
    MountPathCollision {
        mount_path: String,
        existing_volume_name: String,
        new_volume_name: String,
    },
}

/// A builder to build [`Container`] objects.
///
/// Volume mounts are keyed by their mount path, so two mounts claiming the same path are rejected
/// instead of silently shadowing each other inside the container.
#[derive(Clone, Debug, Default)]
pub struct ContainerBuilder {
    container_ports: Option<Vec<ContainerPort>>,
    env: Option<Vec<EnvVar>>,
    image: Option<String>,
    image_pull_policy: Option<String>,
    name: String,
    resources: Option<ResourceRequirements>,

    /// The key is the volume mount path.
    volume_mounts: IndexMap<String, VolumeMount>,
}

impl ContainerBuilder {
    pub fn new(name: &str) -> Result<Self> {
        Self::validate_container_name(name)?;
        Ok(Self {
            name: name.to_string(),
            ..Self::default()
        })
    }

    pub fn image(&mut self, image: impl Into<String>) -> &mut Self {
        self.image = Some(image.into());
        self
    }

    pub fn image_pull_policy(&mut self, image_pull_policy: impl Into<String>) -> &mut Self {
        self.image_pull_policy = Some(image_pull_policy.into());
        self
    }

    pub fn add_env_var(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.get_or_insert_with(Vec::new).push(EnvVar {
            name: name.into(),
            value: Some(value.into()),
            ..EnvVar::default()
        });
        self
    }

    pub fn add_env_vars(&mut self, env_vars: impl IntoIterator<Item = EnvVar>) -> &mut Self {
        self.env.get_or_insert_with(Vec::new).extend(env_vars);
        self
    }

    pub fn add_container_port(&mut self, name: impl Into<String>, port: i32) -> &mut Self {
        self.container_ports
            .get_or_insert_with(Vec::new)
            .push(ContainerPort {
                name: Some(name.into()),
                container_port: port,
                ..ContainerPort::default()
            });
        self
    }

    /// Sets identical requests and limits for cpu and memory.
    pub fn with_cpu_and_memory(
        &mut self,
        cpu: impl Into<String>,
        memory: impl Into<String>,
    ) -> &mut Self {
        let resources = BTreeMap::from([
            ("cpu".to_owned(), Quantity(cpu.into())),
            ("memory".to_owned(), Quantity(memory.into())),
        ]);
        self.resources = Some(ResourceRequirements {
            limits: Some(resources.clone()),
            requests: Some(resources),
            ..ResourceRequirements::default()
        });
        self
    }

    pub fn add_volume_mounts(
        &mut self,
        volume_mounts: impl IntoIterator<Item = VolumeMount>,
    ) -> Result<&mut Self> {
        for volume_mount in volume_mounts {
            self.add_volume_mount_impl(volume_mount)?;
        }
        Ok(self)
    }

    fn add_volume_mount_impl(&mut self, volume_mount: VolumeMount) -> Result<&mut Self> {
        if let Some(existing_volume_mount) = self.volume_mounts.get(&volume_mount.mount_path) {
            if existing_volume_mount != &volume_mount {
                return MountPathCollisionSnafu {
                    mount_path: volume_mount.mount_path,
                    existing_volume_name: existing_volume_mount.name.clone(),
                    new_volume_name: volume_mount.name,
                }
                .fail();
            }
        } else {
            self.volume_mounts
                .insert(volume_mount.mount_path.clone(), volume_mount);
        }

        Ok(self)
    }

    pub fn build(&self) -> Container {
        let volume_mounts = if self.volume_mounts.is_empty() {
            None
        } else {
            Some(self.volume_mounts.values().cloned().collect())
        };

        Container {
            env: self.env.clone(),
            image: self.image.clone(),
            image_pull_policy: self.image_pull_policy.clone(),
            name: self.name.clone(),
            ports: self.container_ports.clone(),
            resources: self.resources.clone(),
            volume_mounts,
            ..Container::default()
        }
    }

    /// Validates a container name is according to the [RFC 1123](https://www.ietf.org/rfc/rfc1123.txt) standard.
    /// Returns [Ok] if the name is according to the standard, and [Err] if not.
    fn validate_container_name(name: &str) -> Result<()> {
        is_rfc_1123_label(name).map_err(|violation| Error::InvalidContainerName {
            container_name: name.to_owned(),
            violation: violation.to_string(),
        })
    }
}
