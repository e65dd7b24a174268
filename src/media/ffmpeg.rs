use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::DecodeConfig;
use crate::error::{EditError, Result};
use crate::media::codec::{EncodeSettings, MediaDecoder, MediaEncoder};
use crate::media::types::{AudioTrack, Frame, MediaBuffer};

/// Stream metadata reported by ffprobe
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration: Option<f64>,
    pub has_audio: bool,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Decoder/encoder backed by the system `ffmpeg` and `ffprobe` binaries
///
/// Video is exchanged as raw `rgb24` frames and audio as interleaved `f32le`
/// PCM, so the rest of the crate never sees a container or codec.
pub struct FfmpegCodec {
    config: DecodeConfig,
}

impl FfmpegCodec {
    pub fn new(config: DecodeConfig) -> Self {
        Self { config }
    }

    /// Read stream metadata for `path`
    pub fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let output = Command::new(&self.config.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(path)
            .output()
            .map_err(|e| EditError::unreadable(path.display(), format!("ffprobe failed to start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EditError::unreadable(path.display(), format!("ffprobe failed: {}", stderr.trim())).into());
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| EditError::unreadable(path.display(), format!("invalid ffprobe output: {}", e)))?;

        parse_probe(&probe).ok_or_else(|| EditError::unreadable(path.display(), "no decodable video stream").into())
    }

    fn decode_frames(&self, path: &Path, info: &MediaInfo) -> Result<Vec<Frame>> {
        let output = Command::new(&self.config.ffmpeg)
            .args(["-v", "error", "-noautorotate", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .output()
            .map_err(|e| EditError::unreadable(path.display(), format!("ffmpeg failed to start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EditError::unreadable(path.display(), format!("ffmpeg failed: {}", stderr.trim())).into());
        }

        let frame_size = info.width as usize * info.height as usize * 3;
        let frames: Vec<Frame> = output
            .stdout
            .chunks_exact(frame_size)
            .filter_map(|chunk| Frame::from_rgb_bytes(info.width, info.height, chunk.to_vec()))
            .collect();

        if frames.is_empty() {
            return Err(EditError::unreadable(path.display(), "no frames decoded").into());
        }

        Ok(frames)
    }

    fn decode_audio(&self, path: &Path) -> Result<AudioTrack> {
        let rate = self.config.audio_sample_rate;
        let channels = self.config.audio_channels;

        let output = Command::new(&self.config.ffmpeg)
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-map", "0:a:0", "-f", "f32le", "-ac", &channels.to_string(), "-ar", &rate.to_string(), "-"])
            .output()
            .map_err(|e| EditError::unreadable(path.display(), format!("ffmpeg failed to start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EditError::unreadable(path.display(), format!("audio decode failed: {}", stderr.trim())).into());
        }

        let samples = output
            .stdout
            .chunks_exact(4)
            .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect();

        Ok(AudioTrack::new(samples, rate, channels))
    }

    /// Dump interleaved PCM into a scratch file ffmpeg can read as a second input
    fn write_audio_scratch(&self, track: &AudioTrack, path: &Path) -> Result<tempfile::NamedTempFile> {
        let mut scratch = tempfile::Builder::new()
            .prefix("clipforge_audio_")
            .suffix(".f32le")
            .tempfile()
            .map_err(|e| EditError::encode_fault(path.display(), format!("cannot create audio scratch file: {}", e)))?;

        let bytes: Vec<u8> = track.samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        scratch
            .write_all(&bytes)
            .and_then(|_| scratch.flush())
            .map_err(|e| EditError::encode_fault(path.display(), format!("cannot write audio scratch file: {}", e)))?;

        Ok(scratch)
    }
}

impl MediaDecoder for FfmpegCodec {
    fn decode(&self, path: &Path) -> Result<MediaBuffer> {
        if !path.is_file() {
            return Err(EditError::unreadable(path.display(), "file not found").into());
        }

        let info = self.probe(path)?;
        debug!(
            "Probed {:?}: {}x{} @ {:.3} fps, audio: {}",
            path, info.width, info.height, info.fps, info.has_audio
        );

        let frames = self.decode_frames(path, &info)?;
        let mut buffer = MediaBuffer::new(frames, info.fps)
            .map_err(|e| EditError::unreadable(path.display(), e.to_string()))?;

        if info.has_audio {
            match self.decode_audio(path) {
                Ok(track) => buffer = buffer.with_audio(track),
                Err(e) => warn!("Dropping audio for {:?}: {}", path, e),
            }
        }

        info!(
            "Decoded {:?}: {} frames, {:.2}s, {}x{}",
            path,
            buffer.frame_count(),
            buffer.duration(),
            buffer.width(),
            buffer.height()
        );
        Ok(buffer)
    }
}

impl MediaEncoder for FfmpegCodec {
    fn encode(&self, buffer: &MediaBuffer, path: &Path, settings: &EncodeSettings) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| EditError::encode_fault(path.display(), format!("cannot create output directory: {}", e)))?;
        }

        let audio_scratch = match buffer.audio() {
            Some(track) if !track.samples.is_empty() => Some((track, self.write_audio_scratch(track, path)?)),
            _ => None,
        };

        let mut cmd = Command::new(&self.config.ffmpeg);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.args([
            "-y",
            "-v",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", buffer.width(), buffer.height()),
            "-r",
            &buffer.fps().to_string(),
            "-i",
            "pipe:0",
        ]);

        if let Some((track, scratch)) = &audio_scratch {
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &track.sample_rate.to_string(),
                "-ac",
                &track.channels.to_string(),
                "-i",
            ])
            .arg(scratch.path());
        }

        // yuv420p needs even dimensions
        cmd.args([
            "-vf",
            "scale=w='max(2,trunc(iw/2)*2)':h='max(2,trunc(ih/2)*2)'",
            "-c:v",
            &settings.video_codec,
            "-pix_fmt",
            "yuv420p",
            "-crf",
            &settings.crf().to_string(),
        ]);

        if audio_scratch.is_some() {
            cmd.args(["-c:a", &settings.audio_codec]);
        } else {
            cmd.arg("-an");
        }
        cmd.arg(path);

        let mut child = cmd
            .spawn()
            .map_err(|e| EditError::encode_fault(path.display(), format!("failed to spawn ffmpeg: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EditError::encode_fault(path.display(), "failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| EditError::encode_fault(path.display(), "failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes).map(|_| bytes)
        });

        let write_result = buffer
            .frames()
            .iter()
            .try_for_each(|frame| stdin.write_all(frame.as_rgb_bytes()));
        drop(stdin);

        let status = child
            .wait()
            .map_err(|e| EditError::encode_fault(path.display(), format!("failed to wait for ffmpeg: {}", e)))?;
        let stderr_bytes = stderr_drain
            .join()
            .map_err(|_| EditError::encode_fault(path.display(), "ffmpeg stderr drain thread panicked"))?
            .unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(EditError::encode_fault(path.display(), format!("ffmpeg exited with {}: {}", status, stderr.trim())).into());
        }
        write_result.map_err(|e| EditError::encode_fault(path.display(), format!("failed to stream frames: {}", e)))?;

        info!(
            "Encoded {:?}: {} frames ({} / {})",
            path,
            buffer.frame_count(),
            settings.video_codec,
            settings.audio_codec
        );
        Ok(())
    }
}

fn parse_probe(probe: &ProbeOutput) -> Option<MediaInfo> {
    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))?;

    let width = video.width.filter(|w| *w > 0)?;
    let height = video.height.filter(|h| *h > 0)?;

    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or_else(|| {
            warn!("No usable frame rate reported, assuming 30 fps");
            30.0
        });

    let duration = video
        .duration
        .as_deref()
        .or_else(|| probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok());

    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Some(MediaInfo {
        width,
        height,
        fps,
        duration,
        has_audio,
    })
}

/// Parse an ffprobe rational such as `30000/1001`
fn parse_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };

    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        assert!((parse_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("25"), Some(25.0));
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("garbage"), None);
    }

    #[test]
    fn test_parse_probe_picks_video_stream() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio", "duration": "9.98"},
                {"codec_type": "video", "width": 640, "height": 360,
                 "avg_frame_rate": "0/0", "r_frame_rate": "24/1"}
            ],
            "format": {"duration": "10.00"}
        }"#;
        let probe: ProbeOutput = serde_json::from_str(json).unwrap();
        let info = parse_probe(&probe).unwrap();

        assert_eq!(info.width, 640);
        assert_eq!(info.height, 360);
        assert_eq!(info.fps, 24.0);
        assert_eq!(info.duration, Some(10.0));
        assert!(info.has_audio);
    }

    #[test]
    fn test_parse_probe_without_video_is_none() {
        let probe: ProbeOutput =
            serde_json::from_str(r#"{"streams": [{"codec_type": "audio"}]}"#).unwrap();
        assert!(parse_probe(&probe).is_none());
    }

    #[test]
    fn test_decode_missing_file_is_unreadable() {
        let codec = FfmpegCodec::new(DecodeConfig::default());
        let err = codec.decode(Path::new("/definitely/not/here.mp4")).unwrap_err();
        assert!(matches!(err.as_edit(), Some(EditError::MediaUnreadable { .. })));
    }
}
