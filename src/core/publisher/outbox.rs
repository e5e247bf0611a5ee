//! Publisher that drops payloads and captions into a local folder.

use super::{CaptionBuilder, PublishError, Publisher};
use crate::core::candidate::Candidate;
use crate::core::identity::fingerprint;
use std::fs;
use std::path::PathBuf;

/// Writes each published candidate as `<fingerprint>.<ext>` plus a
/// `<fingerprint>.txt` caption file.
///
/// Useful as a staging area for an uploader running elsewhere.
pub struct OutboxPublisher {
    dir: PathBuf,
    captions: CaptionBuilder,
}

impl OutboxPublisher {
    /// Create the outbox folder if needed
    pub fn new(dir: impl Into<PathBuf>, captions: CaptionBuilder) -> Result<Self, PublishError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            PublishError::Fatal(format!("cannot create outbox {}: {}", dir.display(), e))
        })?;

        Ok(Self { dir, captions })
    }

}

impl Publisher for OutboxPublisher {
    fn publish(&mut self, candidate: &Candidate) -> Result<(), PublishError> {
        let payload = candidate.payload.as_deref().ok_or_else(|| {
            PublishError::Transient(format!("{} has no payload", candidate.external_id))
        })?;

        if !self.dir.is_dir() {
            return Err(PublishError::Fatal(format!(
                "outbox {} disappeared",
                self.dir.display()
            )));
        }

        let stem = fingerprint(payload).to_hex();
        let ext = candidate.url_extension().unwrap_or_else(|| ".bin".to_string());
        let media_path = self.dir.join(format!("{stem}{ext}"));
        let caption_path = self.dir.join(format!("{stem}.txt"));

        fs::write(&media_path, payload).map_err(|e| {
            PublishError::Transient(format!("write {}: {}", media_path.display(), e))
        })?;
        fs::write(&caption_path, self.captions.build(&candidate.title)).map_err(|e| {
            PublishError::Transient(format!("write {}: {}", caption_path.display(), e))
        })?;

        tracing::info!(
            external_id = %candidate.external_id,
            path = %media_path.display(),
            "wrote candidate to outbox"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidate::Signals;
    use tempfile::TempDir;

    #[test]
    fn writes_media_and_caption() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let mut publisher = OutboxPublisher::new(&out, CaptionBuilder::default()).unwrap();
        let mut candidate = Candidate::new("t3_a", "hello", "a.jpg", Signals::default());
        candidate.payload = Some(b"pixels".to_vec());

        publisher.publish(&candidate).unwrap();

        let stem = fingerprint(b"pixels").to_hex();
        let media = fs::read(out.join(format!("{stem}.jpg"))).unwrap();
        let caption = fs::read_to_string(out.join(format!("{stem}.txt"))).unwrap();
        assert_eq!(media, b"pixels");
        assert_eq!(caption, "hello");
    }

    #[test]
    fn missing_payload_is_transient() {
        let dir = TempDir::new().unwrap();
        let mut publisher = OutboxPublisher::new(dir.path(), CaptionBuilder::default()).unwrap();
        let candidate = Candidate::new("t3_a", "hello", "a.jpg", Signals::default());

        assert!(matches!(
            publisher.publish(&candidate),
            Err(PublishError::Transient(_))
        ));
    }

    #[test]
    fn vanished_outbox_is_fatal() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let mut publisher = OutboxPublisher::new(&out, CaptionBuilder::default()).unwrap();
        fs::remove_dir_all(&out).unwrap();

        let mut candidate = Candidate::new("t3_a", "hello", "a.jpg", Signals::default());
        candidate.payload = Some(b"pixels".to_vec());

        assert!(matches!(
            publisher.publish(&candidate),
            Err(PublishError::Fatal(_))
        ));
    }
}
