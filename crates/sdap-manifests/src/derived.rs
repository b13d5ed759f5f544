//! Values which are computed once per composition and then shared by every template.
//!
//! Whenever two manifests have to agree on something (a ConfigMap name, a mount path, a service
//! name) both read it from [`DerivedValues`] instead of building it themselves.
use crate::config::Values;

pub const COLLECTIONS_MOUNT_PATH: &str = "/etc/collections";
pub const COLLECTIONS_FILE_NAME: &str = "collections.yml";
pub const DEFAULT_COLLECTIONS_CONFIG_MAP: &str = "collections-config";
pub const COLLECTIONS_VOLUME_NAME: &str = "collections-config-volume";

pub const HISTORY_MOUNT_PATH: &str = "/var/lib/ingestion_history";
pub const HISTORY_CLAIM_NAME: &str = "history-volumes-claim";
pub const HISTORY_VOLUME_NAME: &str = "history-volume";

pub const DATA_VOLUME_NAME: &str = "data-volume";

pub const CONFIG_OPERATOR_NAME: &str = "config-operator";
pub const COLLECTION_MANAGER_NAME: &str = "collection-manager";
pub const GRANULE_INGESTER_NAME: &str = "granule-ingester";

const SOLR_PORT: u16 = 8983;
const ZOOKEEPER_PORT: u16 = 2181;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedValues {
    pub release_name: String,
    pub namespace: Option<String>,

    pub collections_mount_path: String,
    pub collections_config_map: String,
    pub collections_file_path: String,
    pub collections_volume_name: String,

    pub history_mount_path: String,
    pub history_claim_name: String,
    pub history_volume_name: String,

    pub data_volume_name: String,

    pub solr_host_and_port: String,
    pub solr_url: String,
    pub zookeeper_host_and_port: String,

    pub webapp_service_name: String,
    pub root_webpage_name: String,
    pub on_earth_proxy_service_name: String,
    pub ingress_name: String,

    /// Path pattern of the application route, e.g. `/nexus/?(.*)`.
    pub app_route_pattern: String,
}

impl DerivedValues {
    pub fn new(values: &Values) -> Self {
        let release = &values.release.name;

        let collections_config_map = values
            .ingestion
            .collections
            .config_map
            .clone()
            .unwrap_or_else(|| DEFAULT_COLLECTIONS_CONFIG_MAP.to_owned());

        let solr_host_and_port = values
            .solr
            .host_and_port
            .clone()
            .unwrap_or_else(|| format!("{release}-solr-svc:{SOLR_PORT}"));
        let zookeeper_host_and_port = values
            .solr
            .zookeeper_host_and_port
            .clone()
            .unwrap_or_else(|| format!("{release}-zookeeper:{ZOOKEEPER_PORT}"));

        Self {
            release_name: release.clone(),
            namespace: values.release.namespace.clone(),

            collections_mount_path: COLLECTIONS_MOUNT_PATH.to_owned(),
            collections_config_map,
            collections_file_path: format!("{COLLECTIONS_MOUNT_PATH}/{COLLECTIONS_FILE_NAME}"),
            collections_volume_name: COLLECTIONS_VOLUME_NAME.to_owned(),

            history_mount_path: HISTORY_MOUNT_PATH.to_owned(),
            history_claim_name: HISTORY_CLAIM_NAME.to_owned(),
            history_volume_name: HISTORY_VOLUME_NAME.to_owned(),

            data_volume_name: DATA_VOLUME_NAME.to_owned(),

            solr_url: format!("http://{solr_host_and_port}/"),
            solr_host_and_port,
            zookeeper_host_and_port,

            webapp_service_name: format!("{release}-webapp"),
            root_webpage_name: format!("{release}-root-webpage"),
            on_earth_proxy_service_name: format!("{release}-onearth-proxy"),
            ingress_name: format!("{release}-ingress"),

            app_route_pattern: format!("/{}/?(.*)", values.webapp.path_prefix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let derived = DerivedValues::new(&Values::default());

        assert_eq!(derived.collections_config_map, "collections-config");
        assert_eq!(derived.collections_file_path, "/etc/collections/collections.yml");
        assert_eq!(derived.solr_host_and_port, "nexus-solr-svc:8983");
        assert_eq!(derived.solr_url, "http://nexus-solr-svc:8983/");
        assert_eq!(derived.zookeeper_host_and_port, "nexus-zookeeper:2181");
        assert_eq!(derived.webapp_service_name, "nexus-webapp");
        assert_eq!(derived.app_route_pattern, "/nexus/?(.*)");
    }

    #[test]
    fn explicit_options_win() {
        let mut values = Values::default();
        values.release.name = "sdap".to_owned();
        values.ingestion.collections.config_map = Some("my-collections".to_owned());
        values.solr.host_and_port = Some("solr.example.com:8983".to_owned());
        values.webapp.path_prefix = "api".to_owned();

        let derived = DerivedValues::new(&values);

        assert_eq!(derived.collections_config_map, "my-collections");
        assert_eq!(derived.solr_url, "http://solr.example.com:8983/");
        assert_eq!(derived.zookeeper_host_and_port, "sdap-zookeeper:2181");
        assert_eq!(derived.on_earth_proxy_service_name, "sdap-onearth-proxy");
        assert_eq!(derived.app_route_pattern, "/api/?(.*)");
    }
}
