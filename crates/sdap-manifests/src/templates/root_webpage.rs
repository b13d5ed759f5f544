//! A static landing page served at `/`.
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        core::v1::{Service, ServicePort, ServiceSpec},
    },
    apimachinery::pkg::util::intstr::IntOrString,
};
use snafu::ResultExt;

use crate::{
    builder::{
        meta::ObjectMetaBuilder,
        pod::{PodBuilder, container::ContainerBuilder},
    },
    config::Values,
    derived::DerivedValues,
    templates::{BuildContainerSnafu, BuildPodTemplateSnafu, Result, deployment, labels},
};

const COMPONENT: &str = "root-webpage";
const HTTP_PORT_NAME: &str = "http";
pub const HTTP_PORT: i32 = 80;

pub fn build_deployment(values: &Values, derived: &DerivedValues) -> Result<Deployment> {
    let container = ContainerBuilder::new(COMPONENT)
        .context(BuildContainerSnafu {
            container_name: COMPONENT,
        })?
        .image(&values.root_webpage.image)
        .add_container_port(HTTP_PORT_NAME, HTTP_PORT)
        .build();

    let template = PodBuilder::new()
        .metadata_builder(|m| m.with_recommended_labels(labels(derived, COMPONENT)))
        .add_container(container)
        .build_template()
        .context(BuildPodTemplateSnafu {
            name: &derived.root_webpage_name,
        })?;

    Ok(deployment(
        &derived.root_webpage_name,
        COMPONENT,
        derived,
        1,
        template,
    ))
}

pub fn build_service(derived: &DerivedValues) -> Service {
    let object_labels = labels(derived, COMPONENT);

    Service {
        metadata: ObjectMetaBuilder::new()
            .name(&derived.root_webpage_name)
            .namespace_opt(derived.namespace.clone())
            .with_recommended_labels(object_labels)
            .build(),
        spec: Some(ServiceSpec {
            selector: Some(object_labels.selector()),
            ports: Some(vec![ServicePort {
                name: Some(HTTP_PORT_NAME.to_owned()),
                port: HTTP_PORT,
                target_port: Some(IntOrString::String(HTTP_PORT_NAME.to_owned())),
                protocol: Some("TCP".to_owned()),
                ..ServicePort::default()
            }]),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}
