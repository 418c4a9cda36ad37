//! Session persistence
//!
//! The persisted form is a JSON object `{measurements, scale, unit, strokes}`.
//! On disk it is wrapped in a versioned envelope and stored as a sidecar
//! next to the image being measured.

use crate::config::ToolConfig;
use crate::error::MeasureError;
use crate::measurement::{Measurement, MeasureIntent, Stroke};
use crate::scale::Scale;
use crate::session::MeasurementSession;
use std::fs;
use std::path::{Path, PathBuf};

const SESSION_SCHEMA_VERSION: u32 = 1;

/// Everything needed to reconstruct a session
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionSnapshot {
    pub measurements: Vec<Measurement>,
    pub scale: Scale,
    pub unit: String,
    #[serde(default)]
    pub strokes: Vec<Stroke>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SnapshotEnvelope {
    version: u32,
    session: SessionSnapshot,
}

/// Error types for persistence operations
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unsupported session file version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid session: {0}")]
    Invalid(#[from] MeasureError),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Get the sidecar path for a given image path
///
/// # Example
/// ```
/// use std::path::Path;
/// use takeoff_core::persistence::snapshot_path;
///
/// let meta_path = snapshot_path(Path::new("/jobs/smith/backyard.png"));
/// assert_eq!(meta_path, Path::new("/jobs/smith/backyard.png.takeoff.json"));
/// ```
pub fn snapshot_path(image_path: &Path) -> PathBuf {
    let mut path_str = image_path.to_string_lossy().to_string();
    path_str.push_str(".takeoff.json");
    PathBuf::from(path_str)
}

/// Serialize a snapshot into the on-disk JSON form
pub fn to_json(snapshot: &SessionSnapshot) -> PersistenceResult<String> {
    let envelope = SnapshotEnvelope { version: SESSION_SCHEMA_VERSION, session: snapshot.clone() };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Parse the on-disk JSON form
///
/// A bare snapshot without the envelope is accepted too, so hosts can hand
/// over what they stored themselves.
pub fn from_json(json: &str) -> PersistenceResult<SessionSnapshot> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.get("version").is_some() {
        let envelope: SnapshotEnvelope = serde_json::from_value(value)?;
        if envelope.version != SESSION_SCHEMA_VERSION {
            return Err(PersistenceError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope.session)
    } else {
        Ok(serde_json::from_value(value)?)
    }
}

/// Write a snapshot atomically (temp file, then rename)
pub fn save_session(path: &Path, snapshot: &SessionSnapshot) -> PersistenceResult<()> {
    let json = to_json(snapshot)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, path)?;

    tracing::debug!(
        path = %path.display(),
        measurements = snapshot.measurements.len(),
        "session saved"
    );
    Ok(())
}

/// Read a snapshot without validating it
pub fn read_snapshot(path: &Path) -> PersistenceResult<SessionSnapshot> {
    let json = fs::read_to_string(path)?;
    from_json(&json)
}

/// Read and validate a session file
pub fn load_session(
    path: &Path,
    intent: MeasureIntent,
    config: ToolConfig,
) -> PersistenceResult<MeasurementSession> {
    let snapshot = read_snapshot(path)?;
    let session = MeasurementSession::from_snapshot(snapshot, intent, config)?;
    tracing::debug!(path = %path.display(), "session loaded");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn sample_session() -> MeasurementSession {
        let mut session =
            MeasurementSession::new(MeasureIntent::AreaCapable, ToolConfig::default());
        session.apply_scale(Scale::new(10.0, "ft"));
        for (x, y) in [(0.0, 0.0), (40.0, 0.0), (0.0, 30.0)] {
            session.add_point(Point::new(x, y));
        }
        session.finish_chain(Some("Patio"), MeasureIntent::AreaCapable).unwrap();
        session
    }

    #[test]
    fn test_snapshot_path() {
        assert_eq!(
            snapshot_path(Path::new("/tmp/site.jpg")),
            PathBuf::from("/tmp/site.jpg.takeoff.json")
        );
    }

    #[test]
    fn test_save_and_load_session() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("nested").join("site.takeoff.json");
        let session = sample_session();

        save_session(&path, &session.snapshot()).expect("save should succeed");
        let loaded = load_session(&path, MeasureIntent::AreaCapable, ToolConfig::default())
            .expect("load should succeed");

        assert_eq!(loaded.snapshot(), session.snapshot());
        assert_eq!(loaded.measurements()[0].value_real_units(), 6.0);
    }

    #[test]
    fn test_bare_snapshot_is_accepted() {
        let snapshot = sample_session().snapshot();
        let bare = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(from_json(&bare).unwrap(), snapshot);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let snapshot = sample_session().snapshot();
        let json = serde_json::json!({ "version": 99, "session": snapshot }).to_string();
        assert!(matches!(from_json(&json), Err(PersistenceError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let result = load_session(
            &temp.path().join("missing.json"),
            MeasureIntent::Linear,
            ToolConfig::default(),
        );
        assert!(matches!(result, Err(PersistenceError::Io(_))));
    }

    #[test]
    fn test_tampered_file_is_invalid() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("site.json");
        let mut snapshot = sample_session().snapshot();
        snapshot.scale = Scale::new(5.0, "ft");
        save_session(&path, &snapshot).unwrap();

        let result = load_session(&path, MeasureIntent::AreaCapable, ToolConfig::default());
        assert!(matches!(result, Err(PersistenceError::Invalid(_))));
    }
}
