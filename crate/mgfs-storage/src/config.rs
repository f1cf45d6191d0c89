/// Connection settings for the MongoDB server holding the bucket.
#[derive(Clone, serde::Deserialize, serde::Serialize, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Host name or IP of the server.
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// User to authenticate as. No authentication if unset.
    pub user: Option<String>,

    pub password: Option<String>,

    /// Database holding the bucket.
    #[serde(default = "default_database")]
    pub database: String,

    /// Name of the GridFS bucket, the prefix of its `.files` and
    /// `.chunks` collections.
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

pub const DEFAULT_PORT: u16 = 27017;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_database() -> String {
    "fs".to_string()
}

fn default_bucket() -> String {
    "fs".to_string()
}

impl StoreConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: default_port(),
            user: None,
            password: None,
            database: default_database(),
            bucket: default_bucket(),
        }
    }

    /// Name of the collection holding file metadata.
    pub fn files_collection(&self) -> String {
        format!("{}.files", self.bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() -> anyhow::Result<()> {
        let config: StoreConfig = toml::from_str(r#"address = "db.example.com""#)?;
        assert_eq!(StoreConfig::new("db.example.com"), config);
        assert_eq!(27017, config.port);
        assert_eq!("fs.files", config.files_collection());

        Ok(())
    }

    #[test]
    fn parse_full() -> anyhow::Result<()> {
        let config: StoreConfig = toml::from_str(
            r#"
            address = "10.0.0.5"
            port = 27018
            user = "reader"
            password = "secret"
            database = "media"
            bucket = "photos"
            "#,
        )?;
        assert_eq!(
            StoreConfig {
                address: "10.0.0.5".to_string(),
                port: 27018,
                user: Some("reader".to_string()),
                password: Some("secret".to_string()),
                database: "media".to_string(),
                bucket: "photos".to_string(),
            },
            config
        );
        assert_eq!("photos.files", config.files_collection());

        Ok(())
    }
}
