use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, HostPathVolumeSource, NFSVolumeSource,
    PersistentVolumeClaimVolumeSource, Volume,
};

/// A builder to build [`Volume`] objects. May only contain one volume source at a time. E.g. a
/// call like `with_host_path` after `with_config_map` will overwrite the `config_map`.
#[derive(Clone, Debug)]
pub struct VolumeBuilder {
    volume: Volume,
}

impl VolumeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            volume: Volume {
                name: name.into(),
                ..Volume::default()
            },
        }
    }

    /// Drops any previously set source.
    fn source(&mut self, set: impl FnOnce(&mut Volume)) -> &mut Self {
        let mut volume = Volume {
            name: self.volume.name.clone(),
            ..Volume::default()
        };
        set(&mut volume);
        self.volume = volume;
        self
    }

    pub fn with_config_map(&mut self, name: impl Into<String>) -> &mut Self {
        let config_map = ConfigMapVolumeSource {
            name: name.into(),
            ..ConfigMapVolumeSource::default()
        };
        self.source(|volume| volume.config_map = Some(config_map))
    }

    pub fn with_host_path(
        &mut self,
        path: impl Into<String>,
        type_: Option<impl Into<String>>,
    ) -> &mut Self {
        let host_path = HostPathVolumeSource {
            path: path.into(),
            type_: type_.map(Into::into),
        };
        self.source(|volume| volume.host_path = Some(host_path))
    }

    pub fn with_nfs(&mut self, server: impl Into<String>, path: impl Into<String>) -> &mut Self {
        let nfs = NFSVolumeSource {
            server: server.into(),
            path: path.into(),
            read_only: None,
        };
        self.source(|volume| volume.nfs = Some(nfs))
    }

    pub fn with_persistent_volume_claim(
        &mut self,
        claim_name: impl Into<String>,
        read_only: bool,
    ) -> &mut Self {
        let claim = PersistentVolumeClaimVolumeSource {
            claim_name: claim_name.into(),
            read_only: Some(read_only),
        };
        self.source(|volume| volume.persistent_volume_claim = Some(claim))
    }

    pub fn build(&self) -> Volume {
        self.volume.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_builder() {
        let volume = VolumeBuilder::new("collections-config-volume")
            .with_config_map("collections-config")
            .build();
        assert_eq!(volume.name, "collections-config-volume");
        assert_eq!(
            volume.config_map.map(|cm| cm.name),
            Some("collections-config".to_owned())
        );

        let volume = VolumeBuilder::new("history-volume")
            .with_persistent_volume_claim("history-volumes-claim", false)
            .build();
        assert_eq!(
            volume
                .persistent_volume_claim
                .map(|pvc| pvc.claim_name),
            Some("history-volumes-claim".to_owned())
        );
    }

    #[test]
    fn last_source_wins() {
        let volume = VolumeBuilder::new("data-volume")
            .with_host_path("/var/lib/sdap/granules", None::<String>)
            .with_nfs("nfs.example.com", "/exports/granules")
            .build();

        assert!(volume.host_path.is_none());
        let nfs = volume.nfs.unwrap();
        assert_eq!(nfs.server, "nfs.example.com");
        assert_eq!(nfs.path, "/exports/granules");
    }
}
