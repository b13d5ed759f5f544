//! The nginx Ingress and its route table.
//!
//! nginx matches regex paths in the listed order, so routes are always emitted as root,
//! application, in-situ API and OnEarth proxy. Optional routes are left out without reordering
//! the remaining ones.
use std::collections::BTreeMap;

use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};

use crate::{
    builder::meta::ObjectMetaBuilder,
    config::Values,
    derived::DerivedValues,
    templates::{labels, onearth_proxy, root_webpage},
};

const COMPONENT: &str = "ingress";
const NGINX_ANNOTATION_PREFIX: &str = "nginx.ingress.kubernetes.io/";

pub const ROOT_ROUTE: &str = "/";
pub const INSITU_ROUTE: &str = "/insitu/?(.*)";
pub const ON_EARTH_ROUTE: &str = "/onearth/?(.*)";

/// A single entry of the route table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub service: String,
    pub port: i32,
}

impl Route {
    fn new(path: impl Into<String>, service: impl Into<String>, port: i32) -> Self {
        Self {
            path: path.into(),
            service: service.into(),
            port,
        }
    }

    fn to_ingress_path(&self) -> HTTPIngressPath {
        HTTPIngressPath {
            path: Some(self.path.clone()),
            path_type: "ImplementationSpecific".to_owned(),
            backend: IngressBackend {
                service: Some(IngressServiceBackend {
                    name: self.service.clone(),
                    port: Some(ServiceBackendPort {
                        number: Some(self.port),
                        ..ServiceBackendPort::default()
                    }),
                }),
                ..IngressBackend::default()
            },
        }
    }
}

/// Builds the ordered route table.
pub fn routes(values: &Values, derived: &DerivedValues) -> Vec<Route> {
    let mut routes = Vec::new();

    if values.root_webpage.enabled {
        routes.push(Route::new(
            ROOT_ROUTE,
            &derived.root_webpage_name,
            root_webpage::HTTP_PORT,
        ));
    }

    routes.push(Route::new(
        &derived.app_route_pattern,
        &derived.webapp_service_name,
        i32::from(values.webapp.port),
    ));

    if values.insitu_api.enabled {
        routes.push(Route::new(
            INSITU_ROUTE,
            &values.insitu_api.service_name,
            i32::from(values.insitu_api.port),
        ));
    }

    if values.on_earth_proxy_ip.is_some() {
        routes.push(Route::new(
            ON_EARTH_ROUTE,
            &derived.on_earth_proxy_service_name,
            onearth_proxy::HTTP_PORT,
        ));
    }

    routes
}

/// Annotations shared by every route.
fn annotations(values: &Values) -> BTreeMap<String, String> {
    let timeout = values.ingress.timeout_seconds.to_string();

    [
        ("enable-cors", "true".to_owned()),
        ("use-regex", "true".to_owned()),
        ("rewrite-target", "/$1".to_owned()),
        ("proxy-read-timeout", timeout.clone()),
        ("proxy-send-timeout", timeout),
    ]
    .into_iter()
    .map(|(key, value)| (format!("{NGINX_ANNOTATION_PREFIX}{key}"), value))
    .collect()
}

pub fn build(values: &Values, derived: &DerivedValues) -> Ingress {
    let paths = routes(values, derived)
        .iter()
        .map(Route::to_ingress_path)
        .collect();

    Ingress {
        metadata: ObjectMetaBuilder::new()
            .name(&derived.ingress_name)
            .namespace_opt(derived.namespace.clone())
            .with_recommended_labels(labels(derived, COMPONENT))
            .with_annotations(annotations(values))
            .build(),
        spec: Some(IngressSpec {
            ingress_class_name: Some(values.ingress.class_name.clone()),
            rules: Some(vec![IngressRule {
                host: values.ingress.host.clone(),
                http: Some(HTTPIngressRuleValue { paths }),
            }]),
            ..IngressSpec::default()
        }),
        ..Ingress::default()
    }
}
