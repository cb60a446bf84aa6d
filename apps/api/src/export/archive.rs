use anyhow::Result;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::info;
use uuid::Uuid;

/// Archives exported profiles to S3 / MinIO.
#[derive(Clone)]
pub struct ProfileArchive {
    client: S3Client,
    bucket: String,
}

impl ProfileArchive {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Uploads the document to `profiles/<job_id>/<filename>` and returns the key.
    pub async fn store(&self, job_id: Uuid, filename: &str, markdown: &str) -> Result<String> {
        let key = archive_key(job_id, filename);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(markdown.as_bytes().to_vec()))
            .content_type("text/markdown")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!("Archived performance profile to s3://{}/{}", self.bucket, key);
        Ok(key)
    }
}

fn archive_key(job_id: Uuid, filename: &str) -> String {
    format!("profiles/{job_id}/{filename}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            archive_key(id, "performance_profile_sre.md"),
            "profiles/00000000-0000-0000-0000-000000000000/performance_profile_sre.md"
        );
    }
}
