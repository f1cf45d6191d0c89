use crate::{Content, DocumentStore, StoreConfig, StoreError};
use futures::StreamExt as _;
use futures::TryStreamExt as _;
use futures::stream::BoxStream;
use mgfs_types::{DocumentId, DocumentMeta, UnixTime};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document, doc};
use mongodb::gridfs::{FilesCollectionDocument, GridFsBucket};
use mongodb::options::{ClientOptions, Credential, GridFsBucketOptions, ServerAddress};
use mongodb::{Client, Collection};

/// A [DocumentStore] backed by a MongoDB GridFS bucket.
pub struct GridFsStore {
    bucket: GridFsBucket,
    files: Collection<FilesCollectionDocument>,
}

impl GridFsStore {
    /// Connect to the server and check that it answers.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let credential = config.user.as_ref().map(|user| {
            Credential::builder()
                .username(user.clone())
                .password(config.password.clone())
                .build()
        });
        let options = ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: config.address.clone(),
                port: Some(config.port),
            }])
            .app_name("mgfs".to_string())
            .credential(credential)
            .build();
        let client = Client::with_options(options)?;
        let db = client.database(&config.database);
        db.run_command(doc! { "ping": 1 }).await?;
        log::info!(
            "Connected to {}:{}, bucket {}.{}",
            config.address,
            config.port,
            config.database,
            config.bucket
        );

        let bucket = db.gridfs_bucket(
            GridFsBucketOptions::builder()
                .bucket_name(config.bucket.clone())
                .build(),
        );
        let files = db.collection::<FilesCollectionDocument>(&config.files_collection());

        Ok(Self { bucket, files })
    }
}

#[async_trait::async_trait]
impl DocumentStore for GridFsStore {
    async fn find_exact(&self, filename: &str) -> Result<Vec<DocumentMeta>, StoreError> {
        let cursor = self.files.find(doc! { "filename": filename }).limit(2).await?;
        let docs: Vec<FilesCollectionDocument> = cursor.try_collect().await?;

        docs.into_iter().map(to_meta).collect()
    }

    async fn count_with_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        Ok(self.files.count_documents(prefix_filter(prefix)).await?)
    }

    async fn iterate_prefix(
        &self,
        prefix: &str,
    ) -> Result<BoxStream<'static, Result<DocumentMeta, StoreError>>, StoreError> {
        let cursor = self.files.find(prefix_filter(prefix)).await?;

        Ok(cursor
            .filter_map(|res| async move {
                match res.map_err(StoreError::from).and_then(to_meta) {
                    Ok(meta) => Some(Ok(meta)),
                    Err(err @ (StoreError::UnsupportedId(_) | StoreError::Unnamed(_))) => {
                        log::warn!("Skipping document: {err}");
                        None
                    }
                    Err(err) => Some(Err(err)),
                }
            })
            .boxed())
    }

    async fn open_content(&self, id: &DocumentId) -> Result<Content, StoreError> {
        let oid = Bson::ObjectId(ObjectId::from_bytes(*id.as_bytes()));
        let file = self
            .files
            .find_one(doc! { "_id": oid.clone() })
            .await?
            .ok_or(StoreError::NotFound)?;
        let stream = self.bucket.open_download_stream(oid).await?;

        Ok(Content::new(
            file.length,
            UnixTime::from_millis(file.upload_date.timestamp_millis()),
            stream,
        ))
    }

    async fn delete_by_id(&self, id: &DocumentId) -> Result<(), StoreError> {
        let oid = ObjectId::from_bytes(*id.as_bytes());
        self.bucket.delete(Bson::ObjectId(oid)).await?;

        Ok(())
    }
}

/// Build a query matching filenames that start with `prefix`.
fn prefix_filter(prefix: &str) -> Document {
    if prefix.is_empty() {
        return doc! {};
    }

    doc! { "filename": { "$regex": format!("^{}", regex::escape(prefix)) } }
}

fn to_meta(file: FilesCollectionDocument) -> Result<DocumentMeta, StoreError> {
    let id = match &file.id {
        Bson::ObjectId(oid) => DocumentId::from(oid.bytes()),
        other => return Err(StoreError::UnsupportedId(other.to_string())),
    };
    let filename = file
        .filename
        .ok_or_else(|| StoreError::Unnamed(id.to_string()))?;

    Ok(DocumentMeta {
        id,
        filename,
        size: file.length,
        upload_time: UnixTime::from_millis(file.upload_date.timestamp_millis()),
    })
}
