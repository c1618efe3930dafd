use crate::model::{NarrationClip, TextChunk};
use regex::Regex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

const COMMA_PAUSE: f64 = 0.2;
const SENTENCE_END_PAUSE: f64 = 0.4;
const WEIGHT_ALPHA: f64 = 0.75;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w[\w'-]*)|([,.!?])").expect("valid word regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct SrtEntry {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Word-level cues for each clip, spread across the clip's duration weighted by
/// word length, with pauses reserved for punctuation. `starts[i]` is where
/// clip `i` begins on the video timeline.
pub fn build_srt_entries(clips: &[NarrationClip], chunks: &[TextChunk], starts: &[f64]) -> Vec<SrtEntry> {
    let mut entries = Vec::new();
    for (clip, &start) in clips.iter().zip(starts) {
        let Some(chunk) = chunks.iter().find(|c| c.index == clip.index) else {
            continue;
        };
        let end = start + clip.duration;
        let elements: Vec<&str> = WORD_RE.find_iter(&chunk.text).map(|m| m.as_str()).collect();
        if elements.is_empty() {
            entries.push(SrtEntry {
                start,
                end,
                text: chunk.text.clone(),
            });
            continue;
        }

        let mut total_pause = 0.0;
        let mut total_weight = 0.0;
        for &element in &elements {
            match element {
                "," => total_pause += COMMA_PAUSE,
                "." | "!" | "?" => total_pause += SENTENCE_END_PAUSE,
                word => total_weight += (word.chars().count() as f64).powf(WEIGHT_ALPHA),
            }
        }
        // pauses shrink proportionally when the clip is shorter than they are
        let pause_scale = if total_pause > clip.duration {
            clip.duration / total_pause
        } else {
            1.0
        };
        let word_time = (clip.duration - total_pause * pause_scale).max(0.0);

        let mut t = start;
        for element in elements {
            match element {
                "," => t += COMMA_PAUSE * pause_scale,
                "." | "!" | "?" => t += SENTENCE_END_PAUSE * pause_scale,
                word => {
                    let weight = (word.chars().count() as f64).powf(WEIGHT_ALPHA);
                    let length = if total_weight > 0.0 {
                        word_time * weight / total_weight
                    } else {
                        0.0
                    };
                    entries.push(SrtEntry {
                        start: t,
                        end: (t + length).min(end),
                        text: word.to_string(),
                    });
                    t += length;
                }
            }
        }
    }
    entries
}

pub fn write_srt(path: &Path, entries: &[SrtEntry]) -> anyhow::Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    for (i, entry) in entries.iter().enumerate() {
        writeln!(f, "{}", i + 1)?;
        writeln!(f, "{} --> {}", format_srt_time(entry.start), format_srt_time(entry.end))?;
        for line in wrap_text(&entry.text, 80) {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)?;
    }
    f.flush()?;
    Ok(())
}

fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

fn wrap_text(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if current.len() + word.len() + 1 > width && !current.is_empty() {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
