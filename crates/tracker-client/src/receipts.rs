//! Receipt uploads and the attachment metadata log.

use tracing::{debug, info};
use tracker_core::{validation, Attachment, Result, TrackerError};

use crate::paths;
use crate::profiles::decode_all;
use crate::Tracker;

impl Tracker {
    /// Upload a receipt for a profile and append its metadata record.
    ///
    /// The blob is written first; a failed blob write surfaces as
    /// [`TrackerError::UploadFailed`] and leaves no dangling metadata.
    pub async fn upload_receipt(
        &self,
        profile_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Attachment> {
        validation::validate_file_name(file_name)?;

        let principal = self.gate().resolve().await?;
        self.require_profile(&principal, profile_id).await?;

        let uploaded_at = self.tree.server_time_millis();
        let key = format!("{}-{}", uploaded_at, file_name);
        debug!(profile = %profile_id, key = %key, size = bytes.len(), "uploading receipt");

        let url = self
            .blobs
            .put_bytes(&key, bytes)
            .await
            .map_err(|e| TrackerError::UploadFailed(e.to_string()))?;

        let id = self.tree.generate_id();
        let attachment = Attachment {
            id: id.clone(),
            profile_id: profile_id.to_string(),
            file_name: file_name.to_string(),
            url,
            uploaded_at,
        };
        self.tree
            .put(
                &paths::receipt(&principal, &id),
                serde_json::to_value(&attachment)?,
            )
            .await?;

        info!(profile = %profile_id, file = %file_name, "uploaded receipt");
        Ok(attachment)
    }

    /// Attachment records for a profile, newest first by `uploadedAt`.
    pub async fn list_receipts(&self, profile_id: &str) -> Result<Vec<Attachment>> {
        let principal = self.gate().resolve().await?;
        let values = self.tree.children(&paths::receipts_root(&principal)).await?;
        let mut receipts: Vec<Attachment> = decode_all(values)?;
        receipts.retain(|r| r.profile_id == profile_id);
        receipts.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(receipts)
    }
}
