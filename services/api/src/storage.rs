//! S3-compatible object storage for user uploads
//!
//! Objects live under `<bucket>/<user_id>/<uuid>.<ext>` and are served from
//! `<public_base_url>/<bucket>/<key>`.

use std::fmt;
use std::str::FromStr;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{Client, primitives::ByteStream};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StorageSettings;

/// Buckets uploads may target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    PostImages,
    CarPhotos,
    Avatars,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::PostImages => "post-images",
            Bucket::CarPhotos => "car-pfp",
            Bucket::Avatars => "user-pfp",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post-images" => Ok(Bucket::PostImages),
            "car-pfp" => Ok(Bucket::CarPhotos),
            "user-pfp" => Ok(Bucket::Avatars),
            other => Err(StorageError::UnknownBucket(other.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Upload body is empty")]
    EmptyBody,

    #[error("Object storage request failed: {0}")]
    Backend(String),
}

/// File extension for an accepted image content type
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Stored object location and public URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: Bucket,
    pub key: String,
    pub url: String,
}

/// Object storage client
#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
    public_base_url: String,
}

impl ObjectStorage {
    pub fn new(client: Client, public_base_url: impl Into<String>) -> Self {
        Self {
            client,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from the AWS provider chain plus the storage settings
    pub async fn from_settings(settings: &StorageSettings) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(true);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self::new(
            Client::from_conf(builder.build()),
            settings.public_base_url.clone(),
        )
    }

    pub fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, key)
    }

    /// Bucket and key of a public URL served by this storage
    pub fn locate(&self, url: &str) -> Option<(Bucket, String)> {
        let rest = url.strip_prefix(&self.public_base_url)?.strip_prefix('/')?;
        let (bucket, key) = rest.split_once('/')?;
        if key.is_empty() {
            return None;
        }
        Some((bucket.parse().ok()?, key.to_string()))
    }

    /// Store an image for `owner` and return where it landed
    pub async fn upload(
        &self,
        bucket: Bucket,
        owner: Uuid,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<StoredObject, StorageError> {
        let extension = extension_for(content_type)
            .ok_or_else(|| StorageError::UnsupportedContentType(content_type.to_string()))?;

        if body.is_empty() {
            return Err(StorageError::EmptyBody);
        }

        let key = format!("{}/{}.{}", owner, Uuid::new_v4(), extension);

        self.client
            .put_object()
            .bucket(bucket.as_str())
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        info!("Stored object {}/{}", bucket, key);

        Ok(StoredObject {
            bucket,
            url: self.public_url(bucket, &key),
            key,
        })
    }

    pub async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(bucket.as_str())
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    /// Bucket and key of a public URL whose key sits under `owner`'s prefix
    pub fn locate_owned(&self, url: &str, owner: Uuid) -> Option<(Bucket, String)> {
        let (bucket, key) = self.locate(url)?;
        let (prefix, _) = key.split_once('/')?;
        (Uuid::parse_str(prefix).ok()? == owner).then_some((bucket, key))
    }

    /// Remove the objects `owner` uploaded behind `urls`, logging failures
    ///
    /// URLs not served by this storage, or keyed under another user, are
    /// skipped.
    pub async fn remove_urls(&self, owner: Uuid, urls: &[String]) {
        for url in urls {
            let Some((bucket, key)) = self.locate_owned(url, owner) else {
                debug!("Not removing {} on behalf of {}", url, owner);
                continue;
            };

            if let Err(e) = self.delete(bucket, &key).await {
                warn!("Failed to remove stored object {}/{}: {}", bucket, key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::Credentials;
    use std::time::Duration;
    use tokio::{io::AsyncReadExt, net::TcpListener};

    const BASE: &str = "https://project.supabase.co/storage/v1/object/public";

    fn config() -> aws_sdk_s3::config::Builder {
        aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "tests"))
            .force_path_style(true)
    }

    fn storage() -> ObjectStorage {
        ObjectStorage::new(Client::from_conf(config().build()), format!("{}/", BASE))
    }

    fn storage_at(endpoint: &str) -> ObjectStorage {
        let config = config().endpoint_url(endpoint).build();
        ObjectStorage::new(Client::from_conf(config), BASE)
    }

    #[test]
    fn buckets_round_trip_their_names() {
        for bucket in [Bucket::PostImages, Bucket::CarPhotos, Bucket::Avatars] {
            assert_eq!(bucket.as_str().parse::<Bucket>().unwrap(), bucket);
        }
        assert!(matches!(
            "avatars".parse::<Bucket>(),
            Err(StorageError::UnknownBucket(_))
        ));
    }

    #[test]
    fn only_image_types_have_extensions() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for("image/webp; charset=binary"), Some("webp"));
        assert_eq!(extension_for("image/heic"), Some("heic"));
        assert_eq!(extension_for("application/pdf"), None);
        assert_eq!(extension_for(""), None);
    }

    #[test]
    fn public_urls_locate_back_to_their_object() {
        let storage = storage();
        let url = storage.public_url(Bucket::CarPhotos, "abc/def.jpg");
        assert_eq!(url, format!("{}/car-pfp/abc/def.jpg", BASE));

        assert_eq!(
            storage.locate(&url),
            Some((Bucket::CarPhotos, "abc/def.jpg".to_string()))
        );
    }

    #[test]
    fn foreign_urls_are_not_located() {
        let storage = storage();
        assert_eq!(storage.locate("https://elsewhere.example/car-pfp/a.jpg"), None);
        assert_eq!(storage.locate(&format!("{}/unknown/a.jpg", BASE)), None);
        assert_eq!(storage.locate(&format!("{}/user-pfp/", BASE)), None);
    }

    #[test]
    fn only_keys_under_the_owner_are_located_for_removal() {
        let storage = storage();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        let own = storage.public_url(Bucket::Avatars, &format!("{}/a.png", owner));
        assert_eq!(
            storage.locate_owned(&own, owner),
            Some((Bucket::Avatars, format!("{}/a.png", owner)))
        );

        let foreign = storage.public_url(Bucket::Avatars, &format!("{}/a.png", other));
        assert_eq!(storage.locate_owned(&foreign, owner), None);

        let flat = storage.public_url(Bucket::Avatars, "a.png");
        assert_eq!(storage.locate_owned(&flat, owner), None);

        let nested = storage.public_url(Bucket::PostImages, &format!("x/{}/a.png", owner));
        assert_eq!(storage.locate_owned(&nested, owner), None);
    }

    #[tokio::test]
    async fn removal_never_reaches_objects_of_other_users() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let storage = storage_at(&format!("http://{}", listener.local_addr().unwrap()));
        let owner = Uuid::new_v4();
        let victim = Uuid::new_v4();

        let foreign = storage.public_url(Bucket::Avatars, &format!("{}/pic.png", victim));
        storage.remove_urls(owner, &[foreign]).await;
        assert!(
            tokio::time::timeout(Duration::from_millis(200), listener.accept())
                .await
                .is_err(),
            "no request should be sent for another user's object"
        );

        let own = storage.public_url(Bucket::Avatars, &format!("{}/pic.png", owner));
        let removal = tokio::spawn({
            let storage = storage.clone();
            async move { storage.remove_urls(owner, &[own]).await }
        });

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0; 4096];
        let n = socket.read(&mut buf).await.unwrap();
        let request = String::from_utf8_lossy(&buf[..n]);
        assert!(
            request.starts_with(&format!("DELETE /user-pfp/{}/pic.png", owner)),
            "unexpected request: {}",
            request
        );

        removal.abort();
    }

    #[tokio::test]
    async fn upload_rejects_bad_input_before_any_request() {
        let storage = storage();
        let owner = Uuid::new_v4();

        let err = storage
            .upload(Bucket::PostImages, owner, "text/plain", vec![1])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedContentType(_)));

        let err = storage
            .upload(Bucket::PostImages, owner, "image/png", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::EmptyBody));
    }
}
