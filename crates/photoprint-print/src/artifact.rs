// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transient print artifacts.
//
// The OS print tools want a file path, so each job's image is written to the
// scratch directory as `<job-id>.<ext>` and removed once printing is over.
// Removal happens on every exit path: explicitly after the body finishes, and
// from `Drop` if the future is dropped or the body panics.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use photoprint_core::error::Result;
use photoprint_core::types::{JobId, MediaKind};

/// A file in the scratch directory that is deleted when this value goes away.
#[derive(Debug)]
pub struct ScratchArtifact {
    path: PathBuf,
    armed: bool,
}

impl ScratchArtifact {
    /// Write `bytes` to `<dir>/<stem>.<extension>`, creating `dir` if needed.
    pub async fn create(dir: &Path, stem: &str, extension: &str, bytes: &[u8]) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let artifact = Self::adopt(dir.join(format!("{stem}.{extension}")));
        // On a failed write the guard drops here and removes any partial file.
        tokio::fs::write(&artifact.path, bytes).await?;
        debug!(path = %artifact.path.display(), bytes = bytes.len(), "artifact written");
        Ok(artifact)
    }

    /// Take ownership of a path that some other code is about to write.
    pub fn adopt(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now. Failures are logged and otherwise ignored.
    pub async fn remove(mut self) {
        self.armed = false;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            log_removal_failure(&self.path, &e);
        } else {
            debug!(path = %self.path.display(), "artifact removed");
        }
    }
}

impl Drop for ScratchArtifact {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                log_removal_failure(&self.path, &e);
            }
        }
    }
}

fn log_removal_failure(path: &Path, err: &std::io::Error) {
    if err.kind() != ErrorKind::NotFound {
        warn!(path = %path.display(), error = %err, "failed to remove print artifact");
    }
}

/// Materialise `payload` as a scratch file, run `body` with its path, then
/// delete the file whatever `body` returned.
///
/// The artifact is named after the job id, so concurrent jobs never collide.
/// A cleanup failure never replaces the body's own outcome.
pub async fn with_printable_artifact<F, Fut, T>(
    scratch_dir: &Path,
    job_id: JobId,
    payload: &[u8],
    media_kind: MediaKind,
    body: F,
) -> Result<T>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let artifact = ScratchArtifact::create(
        scratch_dir,
        &job_id.to_string(),
        media_kind.extension(),
        payload,
    )
    .await?;

    let outcome = body(artifact.path().to_path_buf()).await;
    artifact.remove().await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use photoprint_core::error::PhotoprintError;

    #[tokio::test]
    async fn body_sees_written_file_and_file_is_removed_after() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = JobId::new();

        let seen = with_printable_artifact(dir.path(), job, b"\x89PNG", MediaKind::Png, |path| async move {
            assert!(path.exists());
            assert_eq!(tokio::fs::read(&path).await?, b"\x89PNG");
            Ok::<_, PhotoprintError>(path)
        })
        .await
        .expect("body ok");

        assert_eq!(seen.file_name().unwrap().to_str().unwrap(), format!("{job}.png"));
        assert!(!seen.exists());
    }

    #[tokio::test]
    async fn jpeg_uses_jpg_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = with_printable_artifact(dir.path(), JobId::new(), b"jpeg", MediaKind::Jpeg, |p| async move {
            Ok(p)
        })
        .await
        .unwrap();
        assert_eq!(path.extension().unwrap(), "jpg");
    }

    #[tokio::test]
    async fn file_is_removed_when_body_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut captured = None;

        let result: Result<()> =
            with_printable_artifact(dir.path(), JobId::new(), b"x", MediaKind::Png, |path| {
                captured = Some(path);
                async { Err(PhotoprintError::AllMethodsFailed) }
            })
            .await;

        assert!(matches!(result, Err(PhotoprintError::AllMethodsFailed)));
        assert!(!captured.unwrap().exists());
    }

    #[tokio::test]
    async fn body_outcome_survives_file_already_gone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let value = with_printable_artifact(dir.path(), JobId::new(), b"x", MediaKind::Png, |path| async move {
            tokio::fs::remove_file(&path).await?;
            Ok::<_, PhotoprintError>(42)
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn file_is_removed_when_future_is_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = JobId::new();
        let expected = dir.path().join(format!("{job}.png"));

        let pending = with_printable_artifact(dir.path(), job, b"x", MediaKind::Png, |_| async {
            std::future::pending::<Result<()>>().await
        });
        let _ = tokio::time::timeout(std::time::Duration::from_millis(50), pending).await;

        assert!(!expected.exists());
    }

    #[tokio::test]
    async fn concurrent_jobs_get_distinct_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = with_printable_artifact(dir.path(), JobId::new(), b"a", MediaKind::Png, |p| async move { Ok(p) });
        let b = with_printable_artifact(dir.path(), JobId::new(), b"b", MediaKind::Png, |p| async move { Ok(p) });
        let (a, b) = tokio::join!(a, b);
        assert_ne!(a.unwrap(), b.unwrap());
    }

    #[tokio::test]
    async fn missing_scratch_dir_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("photoprint").join("scratch");
        let expected_parent = nested.clone();
        with_printable_artifact(&nested, JobId::new(), b"x", MediaKind::Png, |p| async move {
            assert!(p.starts_with(&expected_parent));
            Ok(())
        })
        .await
        .unwrap();
    }
}
