//! One template per logical resource. Every template is a pure function of the values and the
//! [`DerivedValues`] of a composition.
use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::PodTemplateSpec,
    },
    apimachinery::pkg::apis::meta::v1::LabelSelector,
};
use snafu::Snafu;

use crate::{
    builder::{
        meta::ObjectMetaBuilder,
        pod::{self, container},
    },
    config::{self, Values},
    derived::DerivedValues,
    kvp::ObjectLabels,
    manifest::Manifest,
    selector::LogicalResource,
};

pub mod collection_manager;
pub mod collections_config;
pub mod config_operator;
pub mod fragments;
pub mod granule_ingester;
pub mod history_claim;
pub mod ingress;
pub mod onearth_proxy;
pub mod root_webpage;
pub mod webapp_service;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("failed to build the {container_name:?} container"))]
    BuildContainer {
        source: container::Error,
        container_name: String,
    },

    #[snafu(display("failed to build the pod template of {name:?}"))]
    BuildPodTemplate { source: pod::Error, name: String },

    #[snafu(display("failed to resolve the collections configuration source"))]
    ResolveCollectionsSource { source: config::Error },

    #[snafu(display(
        "the collections configuration is an existing ConfigMap, there is nothing for the config operator to manage"
    ))]
    UnmanagedCollectionsSource,

    #[snafu(display("the OnEarth proxy resources need \"onEarthProxyIP\" to be set"))]
    MissingOnEarthProxyIp,
}

/// Renders a single logical resource.
pub fn render(
    resource: LogicalResource,
    values: &Values,
    derived: &DerivedValues,
) -> Result<Manifest> {
    Ok(match resource {
        LogicalResource::CollectionsConfig => {
            Manifest::GitBasedConfig(collections_config::build(values, derived)?)
        }
        LogicalResource::ConfigOperator => {
            Manifest::Deployment(config_operator::build(values, derived)?)
        }
        LogicalResource::HistoryClaim => {
            Manifest::PersistentVolumeClaim(history_claim::build(values, derived))
        }
        LogicalResource::CollectionManager => {
            Manifest::Deployment(collection_manager::build(values, derived)?)
        }
        LogicalResource::GranuleIngester => {
            Manifest::Deployment(granule_ingester::build(values, derived)?)
        }
        LogicalResource::RootWebpage => {
            Manifest::Deployment(root_webpage::build_deployment(values, derived)?)
        }
        LogicalResource::RootWebpageService => {
            Manifest::Service(root_webpage::build_service(derived))
        }
        LogicalResource::WebappService => {
            Manifest::Service(webapp_service::build(values, derived))
        }
        LogicalResource::OnEarthProxyService => {
            Manifest::Service(onearth_proxy::build_service(derived))
        }
        LogicalResource::OnEarthProxyEndpoints => {
            Manifest::EndpointSlice(onearth_proxy::build_endpoint_slice(values, derived)?)
        }
        LogicalResource::Ingress => Manifest::Ingress(ingress::build(values, derived)),
    })
}

/// Object labels of a component of this composition.
fn labels<'a>(derived: &'a DerivedValues, component: &'a str) -> ObjectLabels<'a> {
    ObjectLabels {
        instance: &derived.release_name,
        component,
    }
}

/// Wraps a pod template into a Deployment whose selector matches the component's pods.
fn deployment(
    name: &str,
    component: &str,
    derived: &DerivedValues,
    replicas: i32,
    template: PodTemplateSpec,
) -> Deployment {
    let object_labels = labels(derived, component);

    Deployment {
        metadata: ObjectMetaBuilder::new()
            .name(name)
            .namespace_opt(derived.namespace.clone())
            .with_recommended_labels(object_labels)
            .build(),
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(object_labels.selector()),
                ..LabelSelector::default()
            },
            template,
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    }
}
