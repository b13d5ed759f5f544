//! A single rendered manifest and its identity.
use std::fmt::Display;

use k8s_openapi::{
    Resource,
    api::{
        apps::v1::Deployment,
        core::v1::{PersistentVolumeClaim, Service},
        discovery::v1::EndpointSlice,
        networking::v1::Ingress,
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use serde::Serialize;

use crate::crd::git_based_config::GitBasedConfig;

/// Identifies a manifest within a bundle. Two manifests of different kinds may share a name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    pub kind: &'static str,
    pub namespace: Option<String>,
    pub name: String,
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}/{}", self.kind, namespace, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Manifest {
    GitBasedConfig(GitBasedConfig),
    Deployment(Deployment),
    PersistentVolumeClaim(PersistentVolumeClaim),
    Service(Service),
    EndpointSlice(EndpointSlice),
    Ingress(Ingress),
}

impl Manifest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GitBasedConfig(_) => "GitBasedConfig",
            Self::Deployment(_) => Deployment::KIND,
            Self::PersistentVolumeClaim(_) => PersistentVolumeClaim::KIND,
            Self::Service(_) => Service::KIND,
            Self::EndpointSlice(_) => EndpointSlice::KIND,
            Self::Ingress(_) => Ingress::KIND,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::GitBasedConfig(resource) => &resource.metadata,
            Self::Deployment(resource) => &resource.metadata,
            Self::PersistentVolumeClaim(resource) => &resource.metadata,
            Self::Service(resource) => &resource.metadata,
            Self::EndpointSlice(resource) => &resource.metadata,
            Self::Ingress(resource) => &resource.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    pub fn identity(&self) -> Identity {
        Identity {
            kind: self.kind(),
            namespace: self.namespace().map(str::to_owned),
            name: self.name().to_owned(),
        }
    }

    pub fn as_deployment(&self) -> Option<&Deployment> {
        match self {
            Self::Deployment(deployment) => Some(deployment),
            _ => None,
        }
    }

    pub fn as_ingress(&self) -> Option<&Ingress> {
        match self {
            Self::Ingress(ingress) => Some(ingress),
            _ => None,
        }
    }

    pub fn as_git_based_config(&self) -> Option<&GitBasedConfig> {
        match self {
            Self::GitBasedConfig(config) => Some(config),
            _ => None,
        }
    }
}
