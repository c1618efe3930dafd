use crate::audio::{wav_spec, write_silence};
use hound::{SampleFormat, WavSpec};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::model::{NarrationClip, RenderedImage, TextChunk, VideoProject};
use crate::subtitle::{build_srt_entries, write_srt};
use anyhow::{Context, bail};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error, info, warn};

/// An external compositing tool driven by command-line arguments.
pub trait Compositor: Send + Sync {
    fn run(&self, args: &[String]) -> anyhow::Result<()>;
}

pub struct Ffmpeg {
    binary: String,
}

impl Ffmpeg {
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor for Ffmpeg {
    fn run(&self, args: &[String]) -> anyhow::Result<()> {
        debug!("{} {}", self.binary, args.join(" "));
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to spawn {}", self.binary))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            bail!("{} exited with {}: {}", self.binary, output.status, tail.join(" | "));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblySettings {
    pub width: u32,
    pub height: u32,
    pub zoom: f32,
    pub opacity: f32,
    pub padding: f64,
    pub background_volume: f32,
    pub subtitles: bool,
}

impl AssemblySettings {
    pub fn from_config(config: &Config) -> Self {
        let s = &config.settings;
        Self {
            width: s.resolution_w,
            height: s.resolution_h,
            zoom: s.zoom,
            opacity: s.opacity,
            padding: s.tts.silence_duration,
            background_volume: s.background.background_audio_volume,
            subtitles: s.subtitles,
        }
    }
}

/// Where an image is shown on the final timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub length: f64,
}

impl Segment {
    pub fn end(&self) -> f64 {
        self.start + self.length
    }
}

/// Back-to-back segments, each clip followed by `padding` seconds of silence
/// except the last.
pub fn timeline(clips: &[NarrationClip], padding: f64) -> Vec<Segment> {
    let mut start = 0.0;
    let mut segments = Vec::with_capacity(clips.len());
    for (i, clip) in clips.iter().enumerate() {
        let pad = if i + 1 < clips.len() { padding } else { 0.0 };
        let segment = Segment {
            start,
            length: clip.duration + pad,
        };
        start = segment.end();
        segments.push(segment);
    }
    segments
}

/// Checks that clips and images line up one-to-one with existing files.
pub fn validate_inputs(clips: &[NarrationClip], images: &[RenderedImage]) -> Result<()> {
    if clips.is_empty() {
        return Err(PipelineError::assembly("nothing to assemble"));
    }
    if clips.len() != images.len() {
        return Err(PipelineError::assembly(format!(
            "{} narration clips but {} images",
            clips.len(),
            images.len()
        )));
    }
    for (i, (clip, image)) in clips.iter().zip(images).enumerate() {
        if clip.index != i {
            return Err(PipelineError::assembly(format!("missing narration clip {}", i)));
        }
        if image.index != i {
            return Err(PipelineError::assembly(format!("missing image {}", i)));
        }
        if !clip.path.is_file() {
            return Err(PipelineError::assembly(format!(
                "narration clip {} not found at {}",
                i,
                clip.path.display()
            )));
        }
        if !image.path.is_file() {
            return Err(PipelineError::assembly(format!(
                "image {} not found at {}",
                i,
                image.path.display()
            )));
        }
    }
    Ok(())
}

fn concat_line(path: &Path) -> String {
    format!("file '{}'", path.display().to_string().replace('\'', r"'\''"))
}

fn concat_args(list: &Path, out: &Path, copy: bool) -> Vec<String> {
    let codec: &[&str] = if copy { &["-c", "copy"] } else { &["-c:a", "pcm_s16le"] };
    let mut args: Vec<String> = ["-y", "-f", "concat", "-safe", "0", "-i"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.push(list.display().to_string());
    args.extend(codec.iter().map(|s| s.to_string()));
    args.push(out.display().to_string());
    args
}

/// Rate clips are resampled to when they do not share one format.
pub const NARRATION_RATE: u32 = 44_100;

fn narration_spec() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: NARRATION_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Concat filter that resamples every input to mono 16-bit `NARRATION_RATE`.
fn resample_concat_args(inputs: &[PathBuf], out: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into()];
    for input in inputs {
        args.push("-i".into());
        args.push(input.display().to_string());
    }
    let mut graph = String::new();
    for i in 0..inputs.len() {
        graph.push_str(&format!(
            "[{}:a]aresample={},aformat=sample_fmts=s16:channel_layouts=mono[a{}];",
            i, NARRATION_RATE, i
        ));
    }
    for i in 0..inputs.len() {
        graph.push_str(&format!("[a{}]", i));
    }
    graph.push_str(&format!("concat=n={}:v=0:a=1[narration]", inputs.len()));
    args.push("-filter_complex".into());
    args.push(graph);
    args.extend(["-map", "[narration]", "-c:a", "pcm_s16le"].map(String::from));
    args.push(out.display().to_string());
    args
}

/// Escapes a path for use as a filtergraph option value.
fn filter_path(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "/")
        .replace(':', r"\:")
        .replace('\'', r"\'")
}

fn even(v: f32) -> u32 {
    let v = v.round() as u32;
    v + v % 2
}

pub struct MuxInputs<'a> {
    pub background_video: &'a Path,
    pub background_audio: Option<&'a Path>,
    pub narration: &'a Path,
    pub images: &'a [RenderedImage],
    pub segments: &'a [Segment],
    pub subtitles: Option<&'a Path>,
    pub output: &'a Path,
}

/// The single ffmpeg invocation that builds the finished video.
pub fn build_mux_args(settings: &AssemblySettings, inputs: &MuxInputs<'_>) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into()];
    args.extend(["-stream_loop", "-1", "-i"].map(String::from));
    args.push(inputs.background_video.display().to_string());
    args.push("-i".into());
    args.push(inputs.narration.display().to_string());
    for image in inputs.images {
        args.push("-i".into());
        args.push(image.path.display().to_string());
    }
    let music = inputs
        .background_audio
        .filter(|_| settings.background_volume > 0.0);
    if let Some(music) = music {
        args.extend(["-stream_loop", "-1", "-i"].map(String::from));
        args.push(music.display().to_string());
    }

    let (w, h) = (settings.width, settings.height);
    let zoom = settings.zoom.max(1.0);
    let mut graph = format!(
        "[0:v]scale={}:{}:force_original_aspect_ratio=increase,crop={}:{},setsar=1[bg]",
        even(w as f32 * zoom),
        even(h as f32 * zoom),
        w,
        h
    );
    let mut last = "bg".to_string();
    for (k, (image, segment)) in inputs.images.iter().zip(inputs.segments).enumerate() {
        let input = k + 2;
        graph.push_str(&format!(
            ";[{}:v]format=rgba,colorchannelmixer=aa={:.2}[img{}]",
            input, settings.opacity, image.index
        ));
        let next = format!("v{}", image.index);
        graph.push_str(&format!(
            ";[{}][img{}]overlay=(main_w-overlay_w)/2:(main_h-overlay_h)/2:enable='between(t,{:.3},{:.3})'[{}]",
            last,
            image.index,
            segment.start,
            segment.end(),
            next
        ));
        last = next;
    }
    if let Some(srt) = inputs.subtitles {
        graph.push_str(&format!(
            ";[{}]subtitles='{}':force_style='Fontsize=28,OutlineColour=&H000000&,Outline=3,Shadow=0'[subbed]",
            last,
            filter_path(srt)
        ));
        last = "subbed".into();
    }
    let audio = if music.is_some() {
        let music_input = inputs.images.len() + 2;
        graph.push_str(&format!(
            ";[{}:a]volume={:.2}[music];[1:a][music]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[aout]",
            music_input, settings.background_volume
        ));
        "[aout]".to_string()
    } else {
        "1:a:0".to_string()
    };

    let total = inputs.segments.last().map(Segment::end).unwrap_or(0.0);
    args.push("-filter_complex".into());
    args.push(graph);
    args.extend(["-map".to_string(), format!("[{}]", last), "-map".into(), audio]);
    args.push("-t".into());
    args.push(format!("{:.3}", total));
    args.extend(
        [
            "-c:v", "libx264", "-pix_fmt", "yuv420p", "-r", "60", "-c:a", "aac", "-b:a", "192k",
            "-movflags", "+faststart",
        ]
        .map(String::from),
    );
    args.push(inputs.output.display().to_string());
    args
}

/// Sibling path the video is written to before it is moved into place.
fn partial_path(output: &Path) -> PathBuf {
    let name = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".into());
    output.with_file_name(format!(".{}.partial.mp4", name))
}

pub struct Assembler<C> {
    compositor: C,
    settings: AssemblySettings,
}

impl<C: Compositor> Assembler<C> {
    pub fn new(compositor: C, settings: AssemblySettings) -> Self {
        Self {
            compositor,
            settings,
        }
    }

    /// Concatenates the clips with silence gaps into `dir/narration.wav`.
    /// Clips sharing one format are joined as they are; mixed formats are
    /// resampled to a common one first.
    fn narration_track(&self, clips: &[NarrationClip], dir: &Path) -> anyhow::Result<PathBuf> {
        let specs = clips
            .iter()
            .map(|c| wav_spec(&c.path))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let uniform = specs.windows(2).all(|w| w[0] == w[1]);

        let mut silence = None;
        if self.settings.padding > 0.0 && clips.len() > 1 {
            let path = dir.join("silence.wav");
            let spec = if uniform { specs[0] } else { narration_spec() };
            write_silence(&path, spec, self.settings.padding)?;
            silence = Some(path);
        }

        let mut sequence = Vec::with_capacity(clips.len() * 2);
        for (i, clip) in clips.iter().enumerate() {
            sequence.push(fs::canonicalize(&clip.path).unwrap_or_else(|_| clip.path.clone()));
            if let Some(silence) = silence.as_ref().filter(|_| i + 1 < clips.len()) {
                sequence.push(fs::canonicalize(silence).unwrap_or_else(|_| silence.clone()));
            }
        }

        let combined = dir.join("narration.wav");
        if !uniform {
            info!(
                "Narration clips differ in format; resampling to {} Hz mono",
                NARRATION_RATE
            );
            self.compositor
                .run(&resample_concat_args(&sequence, &combined))
                .context("ffmpeg failed to concatenate WAV files")?;
            info!("Combined audio written to {}", combined.display());
            return Ok(combined);
        }

        let list = dir.join("files.txt");
        {
            let mut f = File::create(&list)?;
            for path in &sequence {
                writeln!(f, "{}", concat_line(path))?;
            }
        }
        info!("Created concat list file {}", list.display());

        if let Err(e) = self.compositor.run(&concat_args(&list, &combined, true)) {
            warn!("ffmpeg concat with copy failed; retrying with re-encode: {:#}", e);
            self.compositor
                .run(&concat_args(&list, &combined, false))
                .context("ffmpeg failed to concatenate WAV files")?;
        }
        info!("Combined audio written to {}", combined.display());
        Ok(combined)
    }

    /// Builds the final video for `project`. Inputs are checked before any
    /// tool runs; the output path only ever holds a finished file.
    pub fn assemble(&self, project: &VideoProject, chunks: &[TextChunk]) -> Result<PathBuf> {
        validate_inputs(&project.clips, &project.images)?;
        if !project.background_video.is_file() {
            return Err(PipelineError::assembly(format!(
                "background video not found: {}",
                project.background_video.display()
            )));
        }
        let audio_dir = project.audio_dir();
        fs::create_dir_all(&audio_dir)?;

        let narration = self
            .narration_track(&project.clips, &audio_dir)
            .map_err(|e| PipelineError::assembly(format!("{:#}", e)))?;

        let segments = timeline(&project.clips, self.settings.padding);
        let srt = if self.settings.subtitles {
            let path = project.work_dir.join("subs.srt");
            let starts: Vec<f64> = segments.iter().map(|s| s.start).collect();
            let entries = build_srt_entries(&project.clips, chunks, &starts);
            info!("Writing {} subtitle cues to {}", entries.len(), path.display());
            write_srt(&path, &entries).map_err(|e| PipelineError::assembly(format!("{:#}", e)))?;
            Some(path)
        } else {
            None
        };

        let partial = partial_path(&project.output);
        let inputs = MuxInputs {
            background_video: &project.background_video,
            background_audio: project.background_audio.as_deref(),
            narration: &narration,
            images: &project.images,
            segments: &segments,
            subtitles: srt.as_deref(),
            output: &partial,
        };
        let args = build_mux_args(&self.settings, &inputs);
        info!(
            "Merging {} segments ({:.1}s) into {}",
            segments.len(),
            segments.last().map(Segment::end).unwrap_or(0.0),
            project.output.display()
        );

        if let Err(e) = self.compositor.run(&args) {
            error!("ffmpeg failed to produce final video");
            let _ = fs::remove_file(&partial);
            return Err(PipelineError::assembly(format!("{:#}", e)));
        }
        let produced = fs::metadata(&partial).map(|m| m.len() > 0).unwrap_or(false);
        if !produced {
            let _ = fs::remove_file(&partial);
            return Err(PipelineError::assembly("compositor produced no output"));
        }

        let mut copied = None;
        if let Some(thumbnail) = &project.thumbnail {
            let target = project.output.with_extension("png");
            if thumbnail != &target {
                match fs::copy(thumbnail, &target) {
                    Ok(_) => {
                        info!("Thumbnail copied to {}", target.display());
                        copied = Some(target);
                    }
                    Err(e) => warn!("Could not copy thumbnail {}: {}", thumbnail.display(), e),
                }
            }
        }
        if let Err(e) = fs::rename(&partial, &project.output) {
            let _ = fs::remove_file(&partial);
            if let Some(copied) = copied {
                let _ = fs::remove_file(copied);
            }
            return Err(e.into());
        }
        info!("Final video written to {}", project.output.display());
        Ok(project.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::write_pcm16_wav;
    use crate::config::Theme;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Vec<String>>>,
        fail_copy: bool,
        fail_mux: bool,
    }

    impl Compositor for Recorder {
        fn run(&self, args: &[String]) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(args.to_vec());
            let out = PathBuf::from(args.last().unwrap());
            let is_concat = args.iter().any(|a| a == "concat");
            if is_concat && self.fail_copy && args.iter().any(|a| a == "copy") {
                bail!("codec mismatch");
            }
            if !is_concat && self.fail_mux {
                bail!("filter error");
            }
            fs::write(out, b"media")?;
            Ok(())
        }
    }

    fn settings() -> AssemblySettings {
        AssemblySettings {
            width: 1080,
            height: 1920,
            zoom: 1.0,
            opacity: 0.9,
            padding: 0.3,
            background_volume: 0.15,
            subtitles: false,
        }
    }

    fn clip(index: usize, duration: f64, path: PathBuf) -> NarrationClip {
        NarrationClip {
            index,
            duration,
            path,
            backend: "test".into(),
        }
    }

    fn project(dir: &Path, n: usize) -> VideoProject {
        let mut project = VideoProject::new("run".into(), dir.to_path_buf(), dir.join("Out.mp4"));
        fs::create_dir_all(project.images_dir()).unwrap();
        fs::create_dir_all(project.audio_dir()).unwrap();
        for i in 0..n {
            let wav = project.audio_dir().join(format!("{:03}.wav", i));
            write_pcm16_wav(&wav, &vec![0u8; 1600], 8000).unwrap();
            project.clips.push(clip(i, 0.1, wav));
            let png = project.images_dir().join(format!("{:03}.png", i));
            fs::write(&png, b"png").unwrap();
            project.images.push(RenderedImage {
                index: i,
                path: png,
                theme: Theme::Dark,
            });
        }
        project.background_video = dir.join("bg.mp4");
        fs::write(&project.background_video, b"bg").unwrap();
        project
    }

    #[test]
    fn timeline_pads_between_clips_only() {
        let clips: Vec<_> = [1.0, 2.0, 0.5]
            .iter()
            .enumerate()
            .map(|(i, d)| clip(i, *d, PathBuf::new()))
            .collect();
        let segs = timeline(&clips, 0.3);
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].start, 0.0);
        assert!((segs[0].length - 1.3).abs() < 1e-9);
        assert!((segs[1].start - 1.3).abs() < 1e-9);
        assert!((segs[2].start - 3.6).abs() < 1e-9);
        assert!((segs[2].end() - 4.1).abs() < 1e-9);
    }

    #[test]
    fn mux_args_overlay_each_image_in_its_window() {
        let images: Vec<_> = (0..2)
            .map(|i| RenderedImage {
                index: i,
                path: PathBuf::from(format!("/w/images/{:03}.png", i)),
                theme: Theme::Dark,
            })
            .collect();
        let segments = vec![
            Segment { start: 0.0, length: 1.5 },
            Segment { start: 1.5, length: 2.0 },
        ];
        let inputs = MuxInputs {
            background_video: Path::new("/bg.mp4"),
            background_audio: Some(Path::new("/music.mp3")),
            narration: Path::new("/w/audio/narration.wav"),
            images: &images,
            segments: &segments,
            subtitles: None,
            output: Path::new("/w/out.mp4"),
        };
        let mut s = settings();
        s.zoom = 1.2;
        let args = build_mux_args(&s, &inputs);
        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];

        assert_eq!(&args[..5], &["-y", "-stream_loop", "-1", "-i", "/bg.mp4"]);
        assert!(graph.contains("scale=1296:2304:force_original_aspect_ratio=increase,crop=1080:1920"));
        assert!(graph.contains("[2:v]format=rgba,colorchannelmixer=aa=0.90[img0]"));
        assert!(graph.contains("enable='between(t,0.000,1.500)'[v0]"));
        assert!(graph.contains("[v0][img1]overlay"));
        assert!(graph.contains("enable='between(t,1.500,3.500)'[v1]"));
        assert!(graph.contains(
            "[4:a]volume=0.15[music];[1:a][music]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[aout]"
        ));
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "3.500"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "[v1]"));
        assert_eq!(args.last().unwrap(), "/w/out.mp4");

        s.background_volume = 0.0;
        let args = build_mux_args(&s, &inputs);
        assert!(!args.iter().any(|a| a == "/music.mp3"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a:0"));
    }

    #[test]
    fn missing_clip_is_rejected_before_any_tool_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project(dir.path(), 3);
        project.clips.remove(1);
        let recorder = Recorder::default();
        let assembler = Assembler::new(recorder, settings());
        let err = assembler.assemble(&project, &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Assembly { .. }));
        assert!(assembler.compositor.calls.lock().unwrap().is_empty());
        assert!(!project.output.exists());
    }

    #[test]
    fn deleted_image_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let project = project(dir.path(), 2);
        fs::remove_file(&project.images[1].path).unwrap();
        let assembler = Assembler::new(Recorder::default(), settings());
        let err = assembler.assemble(&project, &[]).unwrap_err();
        assert!(err.to_string().contains("image 1"));
    }

    #[test]
    fn assembles_with_concat_fallback_and_silence() {
        let dir = tempfile::tempdir().unwrap();
        let project = project(dir.path(), 3);
        let recorder = Recorder {
            fail_copy: true,
            ..Default::default()
        };
        let assembler = Assembler::new(recorder, settings());
        let out = assembler.assemble(&project, &[]).unwrap();
        assert_eq!(out, dir.path().join("Out.mp4"));
        assert!(out.is_file());
        assert!(!partial_path(&out).exists());

        let calls = assembler.compositor.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].iter().any(|a| a == "pcm_s16le"));
        let list = fs::read_to_string(project.audio_dir().join("files.txt")).unwrap();
        assert_eq!(list.lines().count(), 5);
        assert!(list.lines().nth(1).unwrap().contains("silence.wav"));
    }

    #[test]
    fn failed_mux_leaves_no_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let project = project(dir.path(), 2);
        let recorder = Recorder {
            fail_mux: true,
            ..Default::default()
        };
        let assembler = Assembler::new(recorder, settings());
        let err = assembler.assemble(&project, &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Assembly { .. }));
        assert!(!project.output.exists());
        assert!(!partial_path(&project.output).exists());
    }

    #[test]
    fn thumbnail_is_copied_beside_the_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project(dir.path(), 1);
        let thumb = dir.path().join("thumbnail.png");
        fs::write(&thumb, b"thumb").unwrap();
        project.thumbnail = Some(thumb);
        let assembler = Assembler::new(Recorder::default(), settings());
        assembler.assemble(&project, &[]).unwrap();
        assert_eq!(fs::read(dir.path().join("Out.png")).unwrap(), b"thumb");
    }

    #[test]
    fn missing_thumbnail_does_not_fail_the_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project(dir.path(), 1);
        project.thumbnail = Some(dir.path().join("gone.png"));
        let assembler = Assembler::new(Recorder::default(), settings());
        let out = assembler.assemble(&project, &[]).unwrap();
        assert!(out.is_file());
        assert!(!dir.path().join("Out.png").exists());
        assert!(!partial_path(&out).exists());
    }

    #[test]
    fn mixed_sample_rates_are_resampled_before_concat() {
        let dir = tempfile::tempdir().unwrap();
        let project = project(dir.path(), 2);
        write_pcm16_wav(&project.clips[0].path, &vec![0u8; 8820], 44100).unwrap();
        write_pcm16_wav(&project.clips[1].path, &vec![0u8; 4410], 22050).unwrap();
        let assembler = Assembler::new(Recorder::default(), settings());
        assembler.assemble(&project, &[]).unwrap();

        let calls = assembler.compositor.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let concat = &calls[0];
        assert!(!concat.iter().any(|a| a == "copy"));
        let graph = &concat[concat.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        for i in 0..3 {
            assert!(graph.contains(&format!(
                "[{}:a]aresample=44100,aformat=sample_fmts=s16:channel_layouts=mono[a{}]",
                i, i
            )));
        }
        assert!(graph.contains("[a0][a1][a2]concat=n=3:v=0:a=1[narration]"));
        assert!(concat.iter().any(|a| a.ends_with("silence.wav")));
        let silence = wav_spec(&project.audio_dir().join("silence.wav")).unwrap();
        assert_eq!(silence.sample_rate, NARRATION_RATE);
        assert_eq!(silence.channels, 1);
    }
}
