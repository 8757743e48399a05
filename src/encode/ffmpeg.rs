use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use anyhow::Context as _;

use crate::audio::mix::write_f32le_file;
use crate::encode::sink::{AudioFormat, FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path. Written as MP4 regardless of extension.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Sink that streams frames into the system `ffmpeg` and muxes captured audio on `end`.
///
/// Video is encoded to a sibling temporary file while frames arrive. Audio pushed through
/// [`FrameSink::push_audio`] is buffered and muxed in a second, stream-copy pass that writes
/// `out_path`. Temporaries are removed on every exit path.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    video_tmp: TempFileGuard,
    audio: Vec<f32>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
            video_tmp: TempFileGuard(None),
            audio: Vec::new(),
        }
    }

    fn finish_video(&mut self) -> StoryreelResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| StoryreelError::capture("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| StoryreelError::capture(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StoryreelError::capture("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| StoryreelError::capture(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        if !status.success() {
            return Err(StoryreelError::capture(format!(
                "ffmpeg exited with status {}: {}",
                status,
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        Ok(())
    }

    fn mux_audio(&self, video: &Path, format: AudioFormat) -> StoryreelResult<()> {
        let audio_path = sibling_path(&self.opts.out_path, "audio.tmp.f32le");
        let _audio_tmp = TempFileGuard(Some(audio_path.clone()));
        write_f32le_file(&self.audio, &audio_path)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null()).stdout(Stdio::null());
        cmd.args(["-y", "-loglevel", "error", "-i"])
            .arg(video)
            .args([
                "-f",
                "f32le",
                "-ar",
                &format.sample_rate.to_string(),
                "-ac",
                &format.channels.to_string(),
                "-i",
            ])
            .arg(&audio_path)
            .args([
                "-map",
                "0:v:0",
                "-map",
                "1:a:0",
                "-c:v",
                "copy",
                "-c:a",
                "aac",
                "-movflags",
                "+faststart",
                "-f",
                "mp4",
            ])
            .arg(&self.opts.out_path);

        let out = cmd
            .output()
            .map_err(|e| StoryreelError::capture(format!("failed to spawn ffmpeg for mux: {e}")))?;
        if !out.status.success() {
            return Err(StoryreelError::capture(format!(
                "ffmpeg mux exited with status {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(())
    }

    fn finalize(&mut self) -> StoryreelResult<()> {
        self.finish_video()?;
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| StoryreelError::capture("ffmpeg sink not started"))?;
        let video = self
            .video_tmp
            .path()
            .map(Path::to_path_buf)
            .ok_or_else(|| StoryreelError::capture("ffmpeg sink has no video output"))?;

        match cfg.audio {
            Some(format) if !self.audio.is_empty() => {
                self.mux_audio(&video, format)?;
                self.video_tmp.remove();
            }
            _ => {
                std::fs::rename(&video, &self.opts.out_path)
                    .with_context(|| format!("move video to '{}'", self.opts.out_path.display()))?;
                self.video_tmp.disarm();
            }
        }
        tracing::debug!(out = %self.opts.out_path.display(), "ffmpeg output finalized");
        Ok(())
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> StoryreelResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(StoryreelError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(StoryreelError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(StoryreelError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if let Some(audio) = cfg.audio
            && (audio.sample_rate == 0 || audio.channels == 0)
        {
            return Err(StoryreelError::validation(
                "audio sample_rate and channels must be non-zero",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(StoryreelError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(StoryreelError::capture(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let video_tmp = sibling_path(&self.opts.out_path, "video.tmp.mp4");
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // ffmpeg has no notion of premultiplied rgba; frames are flattened in push_frame.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args([
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-f",
            "mp4",
        ])
        .arg(&video_tmp);

        let mut child = cmd.spawn().map_err(|e| {
            StoryreelError::capture(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        self.video_tmp = TempFileGuard(Some(video_tmp));

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StoryreelError::capture("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| StoryreelError::capture("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.audio.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> StoryreelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| StoryreelError::capture("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(StoryreelError::capture(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(StoryreelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.premultiplied {
            flatten_premul_over_bg(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;
        } else {
            flatten_straight_over_bg(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(StoryreelError::capture("ffmpeg sink is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            StoryreelError::capture(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn push_audio(&mut self, samples_interleaved: &[f32]) -> StoryreelResult<()> {
        if self.cfg.as_ref().is_some_and(|c| c.audio.is_some()) {
            self.audio.extend_from_slice(samples_interleaved);
        }
        Ok(())
    }

    fn end(&mut self) -> StoryreelResult<()> {
        let res = self.finalize();
        if res.is_err() {
            self.abort();
            let _ = std::fs::remove_file(&self.opts.out_path);
        }
        self.audio = Vec::new();
        res
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
        self.video_tmp.remove();
        self.cfg = None;
        self.audio = Vec::new();
        tracing::debug!(out = %self.opts.out_path.display(), "ffmpeg capture aborted");
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // rawvideo input rate goes before `-i`, as a rational.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// `<dir>/<file name>.<suffix>` next to `path`.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_owned());
    path.with_file_name(format!("{name}.{suffix}"))
}

fn flatten_premul_over_bg(dst: &mut [u8], src_premul: &[u8], bg_rgba: [u8; 4]) -> StoryreelResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(StoryreelError::validation(
            "frame data does not match width*height*4",
        ));
    }
    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            d[c] = (u16::from(s[c]) + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

fn flatten_straight_over_bg(dst: &mut [u8], src: &[u8], bg_rgba: [u8; 4]) -> StoryreelResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(StoryreelError::validation(
            "frame data does not match width*height*4",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        let inv = 255 - a;
        for c in 0..3 {
            d[c] = (mul_div255_u16(u16::from(s[c]), a) + mul_div255_u16(u16::from(bg_rgba[c]), inv))
                .min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

/// Removes the held path on drop unless disarmed.
struct TempFileGuard(Option<PathBuf>);

impl TempFileGuard {
    fn path(&self) -> Option<&Path> {
        self.0.as_deref()
    }

    fn disarm(&mut self) {
        self.0 = None;
    }

    fn remove(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> StoryreelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
