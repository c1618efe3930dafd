use crate::config::Theme;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// Spoken characters per second used for display estimates before audio exists.
const CHARS_PER_SECOND: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadCandidate {
    pub subreddit: String,
    pub id: String,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub comments: Vec<Comment>,
    pub nsfw: bool,
    pub language: Option<String>,
    pub num_comments: u64,
    pub score: i64,
    pub permalink: String,
}

impl ThreadCandidate {
    pub fn url(&self) -> String {
        format!("https://new.reddit.com{}", self.permalink)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub score: i64,
    pub depth: u32,
    pub author: Option<String>,
    pub stickied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Title,
    Body,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub index: usize,
    pub kind: ChunkKind,
    pub text: String,
    pub span: Range<usize>,
    pub estimated_seconds: f64,
}

impl TextChunk {
    pub fn new(index: usize, kind: ChunkKind, text: String, span: Range<usize>) -> Self {
        let estimated_seconds = text.chars().count() as f64 / CHARS_PER_SECOND;
        Self {
            index,
            kind,
            text,
            span,
            estimated_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationClip {
    pub index: usize,
    pub duration: f64,
    pub path: PathBuf,
    pub backend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedImage {
    pub index: usize,
    pub path: PathBuf,
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectState {
    Pending,
    Completed(PathBuf),
    Failed(PathBuf),
}

/// Everything one run hands to the assembler, plus where it ended up.
#[derive(Debug, Clone)]
pub struct VideoProject {
    pub run_id: String,
    pub work_dir: PathBuf,
    pub images: Vec<RenderedImage>,
    pub clips: Vec<NarrationClip>,
    pub background_video: PathBuf,
    pub background_audio: Option<PathBuf>,
    pub thumbnail: Option<PathBuf>,
    pub output: PathBuf,
    pub state: ProjectState,
}

impl VideoProject {
    pub fn new(run_id: String, work_dir: PathBuf, output: PathBuf) -> Self {
        Self {
            run_id,
            work_dir,
            images: Vec::new(),
            clips: Vec::new(),
            background_video: PathBuf::new(),
            background_audio: None,
            thumbnail: None,
            output,
            state: ProjectState::Pending,
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.work_dir.join("images")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.work_dir.join("audio")
    }

    pub fn total_narration(&self) -> f64 {
        self.clips.iter().map(|c| c.duration).sum()
    }
}
