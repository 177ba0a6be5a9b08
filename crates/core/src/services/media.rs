//! Media service: multi-file upload sequencing for posts.

use std::sync::Arc;

use athlo_common::{AppError, AppResult, StorageBackend, generate_storage_key};

/// Maximum number of media files on one post.
pub const MAX_FILES_PER_POST: usize = 5;

/// A file handed in for upload.
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A stored media file.
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Storage key, namespaced by owner.
    pub key: String,
    /// Public URL.
    pub url: String,
    /// Pixel dimensions, for images.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Media service for business logic.
#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn StorageBackend>,
    max_file_size: u64,
}

impl MediaService {
    /// Create a new media service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, max_file_size: u64) -> Self {
        Self {
            storage,
            max_file_size,
        }
    }

    /// Upload a batch of 1..=5 media files for a post.
    ///
    /// Files are uploaded sequentially. If any upload fails, every file
    /// already uploaded in this batch is deleted again (compensation) and
    /// the error is returned; the caller must not have created any post row
    /// yet, so a failed batch leaves neither rows nor orphaned objects.
    pub async fn upload_batch(
        &self,
        owner_id: &str,
        uploads: &[MediaUpload],
    ) -> AppResult<Vec<MediaFile>> {
        if uploads.is_empty() {
            return Err(AppError::Validation(
                "At least one media file is required".to_string(),
            ));
        }
        if uploads.len() > MAX_FILES_PER_POST {
            return Err(AppError::Validation(format!(
                "At most {MAX_FILES_PER_POST} media files per post"
            )));
        }
        for upload in uploads {
            self.validate(upload)?;
        }

        let mut stored: Vec<MediaFile> = Vec::with_capacity(uploads.len());

        for upload in uploads {
            let key = generate_storage_key(owner_id, &upload.file_name);

            match self
                .storage
                .upload(&key, &upload.data, &upload.content_type)
                .await
            {
                Ok(file) => {
                    let (width, height) = if upload.content_type.starts_with("image/") {
                        image_dimensions(&upload.data)
                    } else {
                        (None, None)
                    };
                    stored.push(MediaFile {
                        key: file.key,
                        url: file.url,
                        width,
                        height,
                    });
                }
                Err(e) => {
                    self.compensate(&stored).await;
                    return Err(e);
                }
            }
        }

        Ok(stored)
    }

    /// Best-effort deletion of already-uploaded files after a partial
    /// failure. Cleanup failures are logged, not propagated: the original
    /// upload error is the one the caller needs to see.
    async fn compensate(&self, stored: &[MediaFile]) {
        for file in stored {
            if let Err(e) = self.storage.delete(&file.key).await {
                tracing::warn!(key = %file.key, error = %e, "Failed to clean up uploaded file");
            }
        }
    }

    /// Best-effort deletion of stored media by public URL (post deletion).
    pub async fn delete_by_urls(&self, urls: &[String]) {
        let prefix = self.storage.public_url("");
        for url in urls {
            let Some(key) = url.strip_prefix(&prefix) else {
                tracing::warn!(url = %url, "Media URL outside storage namespace, skipping");
                continue;
            };
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(key, error = %e, "Failed to delete media object");
            }
        }
    }

    fn validate(&self, upload: &MediaUpload) -> AppResult<()> {
        if upload.data.is_empty() {
            return Err(AppError::Validation(format!(
                "File is empty: {}",
                upload.file_name
            )));
        }
        if upload.data.len() as u64 > self.max_file_size {
            return Err(AppError::Validation(format!(
                "File too large: {} (maximum {} bytes)",
                upload.file_name, self.max_file_size
            )));
        }
        if !upload.content_type.starts_with("image/") && !upload.content_type.starts_with("video/")
        {
            return Err(AppError::Validation(format!(
                "Unsupported media type: {}",
                upload.content_type
            )));
        }
        Ok(())
    }
}

/// Probe pixel dimensions of an image payload.
fn image_dimensions(data: &[u8]) -> (Option<u32>, Option<u32>) {
    match image::load_from_memory(data) {
        Ok(img) => (Some(img.width()), Some(img.height())),
        Err(_) => (None, None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use athlo_common::UploadedFile;
    use std::sync::Mutex;

    /// In-memory storage backend that can fail on the Nth upload.
    struct FlakyStorage {
        fail_on: Option<usize>,
        uploads: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
    }

    impl FlakyStorage {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                fail_on,
                uploads: Mutex::new(Vec::new()),
                deletes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl StorageBackend for FlakyStorage {
        async fn upload(
            &self,
            key: &str,
            data: &[u8],
            content_type: &str,
        ) -> AppResult<UploadedFile> {
            let mut uploads = self.uploads.lock().unwrap();
            if Some(uploads.len()) == self.fail_on {
                return Err(AppError::Storage("simulated outage".to_string()));
            }
            uploads.push(key.to_string());
            Ok(UploadedFile {
                key: key.to_string(),
                url: format!("/media/{key}"),
                size: data.len() as u64,
                content_type: content_type.to_string(),
                md5: String::new(),
            })
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.deletes.lock().unwrap().push(key.to_string());
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            format!("/media/{key}")
        }

        async fn exists(&self, _key: &str) -> AppResult<bool> {
            Ok(true)
        }
    }

    fn png_like_upload(name: &str) -> MediaUpload {
        MediaUpload {
            file_name: name.to_string(),
            content_type: "image/png".to_string(),
            data: vec![0_u8; 64],
        }
    }

    #[tokio::test]
    async fn test_upload_batch_success() {
        let storage = Arc::new(FlakyStorage::new(None));
        let service = MediaService::new(Arc::clone(&storage) as Arc<dyn StorageBackend>, 1024);

        let files = service
            .upload_batch("p1", &[png_like_upload("a.png"), png_like_upload("b.png")])
            .await
            .unwrap();

        assert_eq!(files.len(), 2);
        assert!(files[0].key.starts_with("p1/"));
        assert_eq!(storage.uploads.lock().unwrap().len(), 2);
        assert!(storage.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_batch_failure_compensates_earlier_uploads() {
        // Second upload fails: the first must be deleted again.
        let storage = Arc::new(FlakyStorage::new(Some(1)));
        let service = MediaService::new(Arc::clone(&storage) as Arc<dyn StorageBackend>, 1024);

        let result = service
            .upload_batch(
                "p1",
                &[
                    png_like_upload("a.png"),
                    png_like_upload("b.png"),
                    png_like_upload("c.png"),
                ],
            )
            .await;

        assert!(result.is_err());
        let uploads = storage.uploads.lock().unwrap();
        let deletes = storage.deletes.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(deletes.len(), 1);
        assert_eq!(uploads[0], deletes[0]);
    }

    #[tokio::test]
    async fn test_upload_batch_rejects_empty_set() {
        let storage = Arc::new(FlakyStorage::new(None));
        let service = MediaService::new(storage, 1024);

        let result = service.upload_batch("p1", &[]).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upload_batch_rejects_too_many_files() {
        let storage = Arc::new(FlakyStorage::new(None));
        let service = MediaService::new(storage, 1024);

        let uploads: Vec<MediaUpload> = (0..=MAX_FILES_PER_POST)
            .map(|i| png_like_upload(&format!("{i}.png")))
            .collect();

        let result = service.upload_batch("p1", &uploads).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upload_batch_rejects_oversized_file() {
        let storage = Arc::new(FlakyStorage::new(None));
        let service = MediaService::new(storage, 16);

        let result = service.upload_batch("p1", &[png_like_upload("a.png")]).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upload_batch_rejects_unsupported_type() {
        let storage = Arc::new(FlakyStorage::new(None));
        let service = MediaService::new(storage, 1024);

        let upload = MediaUpload {
            file_name: "a.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: vec![0_u8; 8],
        };

        let result = service.upload_batch("p1", &[upload]).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_by_urls_strips_prefix() {
        let storage = Arc::new(FlakyStorage::new(None));
        let service = MediaService::new(Arc::clone(&storage) as Arc<dyn StorageBackend>, 1024);

        service
            .delete_by_urls(&["/media/p1/abc.jpg".to_string()])
            .await;

        assert_eq!(storage.deletes.lock().unwrap().as_slice(), ["p1/abc.jpg"]);
    }
}
