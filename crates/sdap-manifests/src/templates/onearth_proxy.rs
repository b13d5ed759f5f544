//! Routes `/onearth` to an OnEarth tile server outside of the cluster.
//!
//! The Service has no selector, its single endpoint is provided by a hand-written EndpointSlice
//! carrying the configured proxy address.
use std::net::IpAddr;

use k8s_openapi::api::{
    core::v1::{Service, ServicePort, ServiceSpec},
    discovery::v1::{Endpoint, EndpointPort, EndpointSlice},
};
use snafu::OptionExt;

use crate::{
    builder::meta::ObjectMetaBuilder,
    config::Values,
    derived::DerivedValues,
    kvp::K8S_SERVICE_NAME_KEY,
    templates::{MissingOnEarthProxyIpSnafu, Result, labels},
};

const COMPONENT: &str = "onearth-proxy";
const HTTP_PORT_NAME: &str = "http";
pub const HTTP_PORT: i32 = 80;

pub fn build_service(derived: &DerivedValues) -> Service {
    Service {
        metadata: ObjectMetaBuilder::new()
            .name(&derived.on_earth_proxy_service_name)
            .namespace_opt(derived.namespace.clone())
            .with_recommended_labels(labels(derived, COMPONENT))
            .build(),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                name: Some(HTTP_PORT_NAME.to_owned()),
                port: HTTP_PORT,
                protocol: Some("TCP".to_owned()),
                ..ServicePort::default()
            }]),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

pub fn build_endpoint_slice(values: &Values, derived: &DerivedValues) -> Result<EndpointSlice> {
    let ip = values.on_earth_proxy_ip.context(MissingOnEarthProxyIpSnafu)?;
    let address_type = match ip {
        IpAddr::V4(_) => "IPv4",
        IpAddr::V6(_) => "IPv6",
    };

    Ok(EndpointSlice {
        metadata: ObjectMetaBuilder::new()
            .name(&derived.on_earth_proxy_service_name)
            .namespace_opt(derived.namespace.clone())
            .with_recommended_labels(labels(derived, COMPONENT))
            .with_label(K8S_SERVICE_NAME_KEY, &derived.on_earth_proxy_service_name)
            .build(),
        address_type: address_type.to_owned(),
        endpoints: vec![Endpoint {
            addresses: vec![ip.to_string()],
            ..Endpoint::default()
        }],
        ports: Some(vec![EndpointPort {
            name: Some(HTTP_PORT_NAME.to_owned()),
            port: Some(HTTP_PORT),
            protocol: Some("TCP".to_owned()),
            ..EndpointPort::default()
        }]),
        ..EndpointSlice::default()
    })
}
