/// How the filesystem is presented to the kernel.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize, PartialEq, Eq)]
pub struct MountConfig {
    /// Name shown as the source of the mount.
    #[serde(default = "default_fs_name")]
    pub fs_name: String,

    /// Let other users access the filesystem. This requires
    /// `user_allow_other` in /etc/fuse.conf when not running as root.
    #[serde(default)]
    pub allow_other: bool,
}

fn default_fs_name() -> String {
    "mgfs".to_string()
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            fs_name: default_fs_name(),
            allow_other: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config() -> anyhow::Result<()> {
        let config: MountConfig = toml::from_str("")?;
        assert_eq!(MountConfig::default(), config);

        let config: MountConfig = toml::from_str(
            r#"
            fs_name = "media"
            allow_other = true
            "#,
        )?;
        assert_eq!(
            MountConfig {
                fs_name: "media".to_string(),
                allow_other: true,
            },
            config
        );

        Ok(())
    }
}
