//! Output artifact naming.
//!
//! Requests share only the output directory, so by default every artifact
//! gets a per-request UUID suffix. The fixed names (`cut1.mp4`,
//! `merged_video.mp4`, ...) are still available as
//! [`NamingMode::Legacy`], with the caveat that concurrent requests will
//! overwrite each other.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How output files are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    /// `<stem>_<uuid>.<ext>`, never collides
    #[default]
    Unique,
    /// The fixed `<stem>.<ext>` names
    Legacy,
}

/// The kinds of artifact the editor produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// One of the triple-cut segments, numbered from 1
    Cut(usize),
    Merged,
    Resized,
    Edited,
}

impl Artifact {
    /// Legacy file stem
    pub fn stem(&self) -> String {
        match self {
            Self::Cut(n) => format!("cut{}", n),
            Self::Merged => "merged_video".to_string(),
            Self::Resized => "output_video".to_string(),
            Self::Edited => "edited_video".to_string(),
        }
    }
}

/// Resolves artifact names inside an output directory
///
/// One namer is created per request, so all artifacts of a request share
/// the same request id.
#[derive(Debug, Clone)]
pub struct OutputNamer {
    dir: PathBuf,
    mode: NamingMode,
    request_id: Uuid,
}

impl OutputNamer {
    pub fn new<P: Into<PathBuf>>(dir: P, mode: NamingMode) -> Self {
        Self {
            dir: dir.into(),
            mode,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Path for a video artifact
    pub fn video_path(&self, artifact: Artifact) -> PathBuf {
        let name = match self.mode {
            NamingMode::Legacy => format!("{}.mp4", artifact.stem()),
            NamingMode::Unique => format!("{}_{}.mp4", artifact.stem(), self.request_id.simple()),
        };
        self.dir.join(name)
    }
}
