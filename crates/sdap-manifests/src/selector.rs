//! Decides which logical resources a composition consists of.
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::debug;

use crate::config::Values;

/// Every resource a composition can emit, declared in emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum LogicalResource {
    CollectionsConfig,
    ConfigOperator,
    HistoryClaim,
    CollectionManager,
    GranuleIngester,
    RootWebpage,
    RootWebpageService,
    WebappService,
    OnEarthProxyService,
    OnEarthProxyEndpoints,
    Ingress,
}

impl LogicalResource {
    /// The Kubernetes kind this resource renders to.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CollectionsConfig => "GitBasedConfig",
            Self::ConfigOperator
            | Self::CollectionManager
            | Self::GranuleIngester
            | Self::RootWebpage => "Deployment",
            Self::HistoryClaim => "PersistentVolumeClaim",
            Self::RootWebpageService | Self::WebappService | Self::OnEarthProxyService => {
                "Service"
            }
            Self::OnEarthProxyEndpoints => "EndpointSlice",
            Self::Ingress => "Ingress",
        }
    }

    /// Whether the resource is part of a composition of `values`.
    pub fn is_selected(&self, values: &Values) -> bool {
        let ingestion = &values.ingestion;
        match self {
            Self::CollectionsConfig | Self::ConfigOperator => {
                ingestion.enabled && ingestion.collections.config_map.is_none()
            }
            Self::HistoryClaim => ingestion.enabled && !ingestion.history.solr_enabled,
            Self::CollectionManager | Self::GranuleIngester => ingestion.enabled,
            Self::RootWebpage | Self::RootWebpageService => values.root_webpage.enabled,
            Self::WebappService => values.webapp.enabled,
            Self::OnEarthProxyService | Self::OnEarthProxyEndpoints => {
                values.on_earth_proxy_ip.is_some()
            }
            Self::Ingress => values.ingress.enabled,
        }
    }
}

/// Returns the selected resources in emission order.
pub fn select(values: &Values) -> Vec<LogicalResource> {
    LogicalResource::iter()
        .filter(|resource| {
            let selected = resource.is_selected(values);
            debug!(%resource, kind = resource.kind(), selected, "evaluated resource predicate");
            selected
        })
        .collect()
}
