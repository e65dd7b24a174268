use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
    config::Config,
    directive,
    error::{EditError, EditorError, Result},
    imaging::{self, ImageParams},
    media::{FfmpegCodec, MediaBuffer, MediaCodec},
    output::{Artifact, OutputNamer},
    pipeline::{self, Quality},
};

/// Outcome of one editor request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditStatus {
    Success,
    Failure,
}

/// What a caller gets back from every editor entry point
///
/// Failures carry a message and never any outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditResult {
    pub status: EditStatus,
    pub message: String,
    pub outputs: Vec<PathBuf>,
}

impl EditResult {
    pub fn success<S: Into<String>>(message: S, outputs: Vec<PathBuf>) -> Self {
        Self {
            status: EditStatus::Success,
            message: message.into(),
            outputs,
        }
    }

    pub fn failure(err: &EditorError) -> Self {
        Self {
            status: EditStatus::Failure,
            message: err.user_message(),
            outputs: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == EditStatus::Success
    }
}

/// Request-level facade: decode, transform, encode
///
/// Every entry point blocks until its outputs are written and reports the
/// outcome as an [`EditResult`] rather than an error.
pub struct Editor {
    config: Config,
    codec: Arc<dyn MediaCodec>,
    pool: ThreadPool,
}

impl Editor {
    /// Create an editor around a decode/encode collaborator
    pub fn new(config: Config, codec: Arc<dyn MediaCodec>) -> Result<Self> {
        config.validate()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.processing.threads)
            .thread_name(|i| format!("clipforge-worker-{}", i))
            .build()
            .map_err(|e| EditorError::generic(format!("Failed to start worker pool: {}", e)))?;

        debug!("Editor ready with {} worker threads", config.processing.threads);
        Ok(Self { config, codec, pool })
    }

    /// Editor backed by the system ffmpeg binaries
    pub fn with_ffmpeg(config: Config) -> Result<Self> {
        let codec = FfmpegCodec::new(config.decode.clone());
        Self::new(config, Arc::new(codec))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Apply the directives found in `text` to a video
    pub fn edit_video(&self, video: Option<&Path>, text: &str) -> EditResult {
        let result = self.run_edit(video, text);
        self.finish("edit", result, "Editing Successful")
    }

    /// Cut three independent segments out of a video
    pub fn cut_video(&self, video: Option<&Path>, ranges: [(f64, f64); 3]) -> EditResult {
        let result = self.run_cut(video, &ranges);
        self.finish("cut", result, "Cuts successful.")
    }

    /// Concatenate videos in the order given
    pub fn merge_videos(&self, videos: &[Option<&Path>]) -> EditResult {
        let result = self.run_merge(videos);
        self.finish("merge", result, "Merging successful!")
    }

    /// Resize a video to one of the named qualities
    pub fn change_resolution(&self, video: Option<&Path>, quality: &str) -> EditResult {
        let result = self.run_resolution(video, quality);
        self.finish("resolution", result, "Resolution changed successfully.")
    }

    /// Adjust a single image and write it as a JPEG
    pub fn edit_image(&self, image: Option<&Path>, params: &ImageParams) -> EditResult {
        let result = self.run_image(image, params);
        self.finish("image", result, "Image processed successfully.")
    }

    fn finish(&self, action: &str, result: Result<Vec<PathBuf>>, message: &str) -> EditResult {
        match result {
            Ok(outputs) => {
                info!("{} request succeeded with {} output(s)", action, outputs.len());
                EditResult::success(message, outputs)
            }
            Err(e) => {
                error!("{} request failed: {}", action, e);
                EditResult::failure(&e)
            }
        }
    }

    fn namer(&self) -> OutputNamer {
        OutputNamer::new(self.config.output.dir.clone(), self.config.output.naming)
    }

    fn decode(&self, path: &Path) -> Result<MediaBuffer> {
        let buffer = self.codec.decode(path)?;
        info!(
            "Decoded {}: {:.2}s {}x{} @ {:.2} fps",
            path.display(),
            buffer.duration(),
            buffer.width(),
            buffer.height(),
            buffer.fps()
        );
        Ok(buffer)
    }

    /// Encode every artifact
    ///
    /// If any write fails, the failed file and every earlier output are
    /// removed so a failed request leaves nothing behind.
    fn encode_all(&self, artifacts: Vec<(PathBuf, MediaBuffer)>) -> Result<Vec<PathBuf>> {
        let settings = &self.config.output.encode;
        let mut written: Vec<PathBuf> = Vec::with_capacity(artifacts.len());

        for (path, buffer) in artifacts {
            if let Err(e) = self.codec.encode(&buffer, &path, settings) {
                for partial in written.iter().chain(std::iter::once(&path)) {
                    discard(partial);
                }
                return Err(e);
            }
            info!("Wrote {}", path.display());
            written.push(path);
        }

        Ok(written)
    }

    fn run_edit(&self, video: Option<&Path>, text: &str) -> Result<Vec<PathBuf>> {
        let path = video.ok_or_else(|| EditError::missing("a video file"))?;
        let ops = directive::extract(text);
        info!("Edit request on {} with {} operation(s)", path.display(), ops.len());

        let buffer = self.decode(path)?;
        let edited = self.pool.install(|| pipeline::apply(buffer, &ops))?;

        self.encode_all(vec![(self.namer().video_path(Artifact::Edited), edited)])
    }

    fn run_cut(&self, video: Option<&Path>, ranges: &[(f64, f64)]) -> Result<Vec<PathBuf>> {
        let path = video.ok_or_else(|| EditError::missing("a video file"))?;
        let buffer = self.decode(path)?;
        let segments = self.pool.install(|| pipeline::cut_segments(&buffer, ranges))?;

        let namer = self.namer();
        let artifacts = segments
            .into_iter()
            .enumerate()
            .map(|(i, segment)| (namer.video_path(Artifact::Cut(i + 1)), segment))
            .collect();
        self.encode_all(artifacts)
    }

    fn run_merge(&self, videos: &[Option<&Path>]) -> Result<Vec<PathBuf>> {
        let what = format!("all {} videos", videos.len());
        let paths = pipeline::require_all(videos, &what)?;

        let inputs = paths
            .into_iter()
            .map(|path| self.decode(path))
            .collect::<Result<Vec<_>>>()?;
        let merged = self.pool.install(|| pipeline::merge(inputs))?;

        self.encode_all(vec![(self.namer().video_path(Artifact::Merged), merged)])
    }

    fn run_resolution(&self, video: Option<&Path>, quality: &str) -> Result<Vec<PathBuf>> {
        let path = video.ok_or_else(|| EditError::missing("a video file"))?;
        let quality: Quality = quality.parse()?;

        let buffer = self.decode(path)?;
        let resized = self.pool.install(|| pipeline::change_resolution(buffer, quality));

        self.encode_all(vec![(self.namer().video_path(Artifact::Resized), resized)])
    }

    fn run_image(&self, image: Option<&Path>, params: &ImageParams) -> Result<Vec<PathBuf>> {
        let source = image.map(imaging::load_image).transpose()?;
        let adjusted = self.pool.install(|| imaging::adjust(source.as_ref(), params))?;
        let path = imaging::save_jpeg(&adjusted, &self.config.output.dir, self.config.output.image_quality)?;
        Ok(vec![path])
    }
}

fn discard(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => error!("Could not remove partial output {}: {}", path.display(), e),
    }
}
