use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::{Service, ServicePort, ServiceSpec},
    apimachinery::pkg::util::intstr::IntOrString,
};

use crate::{
    builder::meta::ObjectMetaBuilder, config::Values, derived::DerivedValues, templates::labels,
};

const COMPONENT: &str = "webapp";

/// Exposes the driver of the analysis webapp. The webapp itself is a Spark application, its
/// driver pod is labelled by the Spark operator.
pub fn build(values: &Values, derived: &DerivedValues) -> Service {
    let port = i32::from(values.webapp.port);

    Service {
        metadata: ObjectMetaBuilder::new()
            .name(&derived.webapp_service_name)
            .namespace_opt(derived.namespace.clone())
            .with_recommended_labels(labels(derived, COMPONENT))
            .build(),
        spec: Some(ServiceSpec {
            selector: Some(BTreeMap::from([
                (
                    "sparkoperator.k8s.io/app-name".to_owned(),
                    derived.webapp_service_name.clone(),
                ),
                ("spark-role".to_owned(), "driver".to_owned()),
            ])),
            ports: Some(vec![ServicePort {
                name: Some("webapp".to_owned()),
                port,
                target_port: Some(IntOrString::Int(port)),
                protocol: Some("TCP".to_owned()),
                ..ServicePort::default()
            }]),
            type_: Some("ClusterIP".to_owned()),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_port_follows_values() {
        let mut values = Values::default();
        values.webapp.port = 9000;

        let service = build(&values, &DerivedValues::new(&values));

        assert_eq!(service.metadata.name.as_deref(), Some("nexus-webapp"));
        let port = &service.spec.unwrap().ports.unwrap()[0];
        assert_eq!(port.port, 9000);
        assert_eq!(port.target_port, Some(IntOrString::Int(9000)));
    }
}
