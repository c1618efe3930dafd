use crate::config::{Config, Theme};
use crate::error::{PipelineError, Result};
use crate::model::{ChunkKind, RenderedImage, TextChunk};
use anyhow::{Context, anyhow};
use fontdue::{Font, FontSettings};
use image::{Rgba, RgbaImage, imageops};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

const MIN_FONT_SIZE: f32 = 14.0;
const LINE_SPACING: f32 = 1.25;
const SHADOW: [(i32, i32, u8); 2] = [(2, 2, 120), (1, 1, 90)];
const THUMBNAIL_SIZE: (u32, u32) = (1280, 720);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: [u8; 4],
    pub text: [u8; 4],
}

pub fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            background: [33, 32, 28, 255],
            text: [215, 218, 220, 255],
        },
        Theme::Light => Palette {
            background: [255, 255, 255, 255],
            text: [26, 26, 27, 255],
        },
        Theme::Transparent => Palette {
            background: [0, 0, 0, 0],
            text: [255, 255, 255, 255],
        },
    }
}

pub fn blank_canvas(theme: Theme, width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(palette(theme).background))
}

/// Splits a word wider than `max_px` into pieces that fit.
fn split_long_word(word: &str, max_px: f32, measure: &dyn Fn(&str) -> f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        let mut candidate = current.clone();
        candidate.push(ch);
        if measure(&candidate) <= max_px || current.is_empty() {
            current = candidate;
        } else {
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Wraps `text` into lines no wider than `max_px` as reported by `measure`.
pub fn wrap_by_width(text: &str, max_px: f32, measure: &dyn Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if measure(word) > max_px {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.extend(split_long_word(word, max_px, measure));
            continue;
        }
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if measure(&candidate) <= max_px {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Largest font size (stepping down by 2px from `start`) whose wrapped lines
/// fit inside `max_w` x `max_h`.
pub fn fit_text(
    text: &str,
    start: f32,
    max_w: f32,
    max_h: f32,
    measure: &dyn Fn(&str, f32) -> f32,
) -> (f32, Vec<String>) {
    let mut size = start;
    loop {
        let lines = wrap_by_width(text, max_w, &|s| measure(s, size));
        let height = lines.len() as f32 * size * LINE_SPACING;
        let fits = height <= max_h && lines.iter().all(|l| measure(l, size) <= max_w);
        if fits || size - 2.0 < MIN_FONT_SIZE {
            return (size, lines);
        }
        size -= 2.0;
    }
}

fn blend_pixel(img: &mut RgbaImage, x: i32, y: i32, color: [u8; 4], coverage: u8) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let a = (coverage as f32 / 255.0) * (color[3] as f32 / 255.0);
    if a <= 0.0 {
        return;
    }
    let dst = img.get_pixel_mut(x as u32, y as u32);
    let da = dst[3] as f32 / 255.0;
    let out_a = a + da * (1.0 - a);
    for i in 0..3 {
        let src = color[i] as f32;
        let d = dst[i] as f32;
        let v = (src * a + d * da * (1.0 - a)) / out_a.max(f32::EPSILON);
        dst[i] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

/// A loaded font that can measure and draw lines of text.
pub struct TextPainter {
    font: Font,
}

impl TextPainter {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("missing font '{}'", path.display()))?;
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| anyhow!("failed to parse font {}: {}", path.display(), e))?;
        Ok(Self { font })
    }

    pub fn measure(&self, text: &str, size: f32) -> f32 {
        text.chars()
            .map(|c| self.font.metrics(c, size).advance_width)
            .sum()
    }

    fn ascent(&self, size: f32) -> f32 {
        self.font
            .horizontal_line_metrics(size)
            .map(|m| m.ascent)
            .unwrap_or(size * 0.8)
    }

    fn draw_line(&self, img: &mut RgbaImage, x: f32, top: f32, text: &str, size: f32, color: [u8; 4]) {
        let baseline = (top + self.ascent(size)).round() as i32;
        let mut pen = x;
        for c in text.chars() {
            let (m, bitmap) = self.font.rasterize(c, size);
            let gx = pen.round() as i32 + m.xmin;
            let gy = baseline - m.height as i32 - m.ymin;
            for row in 0..m.height {
                for col in 0..m.width {
                    let mask = bitmap[row * m.width + col];
                    if mask != 0 {
                        blend_pixel(img, gx + col as i32, gy + row as i32, color, mask);
                    }
                }
            }
            pen += m.advance_width;
        }
    }

    /// Draws `lines` horizontally centered, the block vertically centered in `area`.
    fn draw_centered(
        &self,
        img: &mut RgbaImage,
        lines: &[String],
        size: f32,
        area: (f32, f32, f32, f32),
        palette: Palette,
    ) {
        let (ax, ay, aw, ah) = area;
        let line_height = size * LINE_SPACING;
        let mut y = ay + (ah - line_height * lines.len() as f32) / 2.0;
        for line in lines {
            let x = ax + (aw - self.measure(line, size)) / 2.0;
            for (dx, dy, alpha) in SHADOW {
                self.draw_line(img, x + dx as f32, y + dy as f32, line, size, [0, 0, 0, alpha]);
            }
            self.draw_line(img, x, y, line, size, palette.text);
            y += line_height;
        }
    }
}

pub struct Renderer {
    painter: TextPainter,
    width: u32,
    height: u32,
    theme: Theme,
    font_size: f32,
    margin: u32,
}

impl Renderer {
    pub fn new(painter: TextPainter, config: &Config) -> Self {
        let s = &config.settings;
        Self {
            painter,
            width: s.resolution_w,
            height: s.resolution_h,
            theme: s.theme,
            font_size: s.font_size,
            margin: s.resolution_w / 20,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let painter = TextPainter::load(&config.settings.font_path)?;
        Ok(Self::new(painter, config))
    }

    /// Draws one chunk on a themed canvas of the video's resolution.
    pub fn render_chunk(&self, chunk: &TextChunk) -> RgbaImage {
        let palette = palette(self.theme);
        let mut img = blank_canvas(self.theme, self.width, self.height);
        let start = match chunk.kind {
            ChunkKind::Title => self.font_size * 1.25,
            _ => self.font_size,
        };
        let max_w = (self.width - 2 * self.margin) as f32;
        let max_h = (self.height - 2 * self.margin) as f32;
        let (size, lines) = fit_text(&chunk.text, start, max_w, max_h, &|s, px| {
            self.painter.measure(s, px)
        });
        debug!("Chunk {} laid out in {} lines at {}px", chunk.index, lines.len(), size);
        let area = (
            self.margin as f32,
            self.margin as f32,
            max_w,
            max_h,
        );
        self.painter.draw_centered(&mut img, &lines, size, area, palette);
        img
    }

    pub fn render_to_file(&self, chunk: &TextChunk, dir: &Path) -> anyhow::Result<RenderedImage> {
        let path = dir.join(format!("{:03}.png", chunk.index));
        self.render_chunk(chunk)
            .save(&path)
            .with_context(|| format!("write {}", path.display()))?;
        Ok(RenderedImage {
            index: chunk.index,
            path,
            theme: self.theme,
        })
    }

    /// Title card for the upload: drawn over `background` when given (scaled to
    /// thumbnail size), else over a themed canvas, with the channel name below.
    pub fn render_thumbnail(
        &self,
        title: &str,
        channel: &str,
        background: Option<&Path>,
        out: &Path,
    ) -> anyhow::Result<PathBuf> {
        let (w, h) = THUMBNAIL_SIZE;
        let mut img = match background {
            Some(path) => {
                let base = image::open(path)
                    .with_context(|| format!("open thumbnail background {}", path.display()))?
                    .to_rgba8();
                imageops::resize(&base, w, h, imageops::FilterType::Lanczos3)
            }
            None => blank_canvas(self.theme, w, h),
        };
        let palette = palette(self.theme);
        let margin = (w / 12) as f32;
        let (size, lines) = fit_text(
            title,
            self.font_size * 1.5,
            w as f32 - 2.0 * margin,
            h as f32 * 0.7,
            &|s, px| self.painter.measure(s, px),
        );
        self.painter
            .draw_centered(&mut img, &lines, size, (margin, margin / 2.0, w as f32 - 2.0 * margin, h as f32 * 0.75), palette);

        let channel_size = (size * 0.5).max(MIN_FONT_SIZE);
        self.painter.draw_centered(
            &mut img,
            &[channel.to_string()],
            channel_size,
            (margin, h as f32 * 0.8, w as f32 - 2.0 * margin, h as f32 * 0.15),
            palette,
        );

        img.save(out).with_context(|| format!("write {}", out.display()))?;
        Ok(out.to_path_buf())
    }
}

/// Renders every chunk on blocking worker tasks and returns images in chunk order.
pub async fn render_all(
    renderer: Arc<Renderer>,
    chunks: &[TextChunk],
    dir: &Path,
) -> Result<Vec<RenderedImage>> {
    info!("Rendering {} images", chunks.len());
    let mut tasks = JoinSet::new();
    for chunk in chunks.iter().cloned() {
        let renderer = Arc::clone(&renderer);
        let dir = dir.to_path_buf();
        tasks.spawn_blocking(move || {
            let index = chunk.index;
            (index, renderer.render_to_file(&chunk, &dir))
        });
    }

    let mut images = Vec::with_capacity(chunks.len());
    let mut first_error: Option<PipelineError> = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(image))) => images.push(image),
            Ok((index, Err(e))) => {
                let err = PipelineError::Render {
                    chunk: index,
                    source: e,
                };
                first_error = match first_error {
                    Some(PipelineError::Render { chunk, source }) if chunk < index => {
                        Some(PipelineError::Render { chunk, source })
                    }
                    _ => Some(err),
                };
            }
            Err(join) => {
                return Err(PipelineError::Render {
                    chunk: usize::MAX,
                    source: anyhow!("render task panicked: {}", join),
                });
            }
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }
    images.sort_by_key(|img| img.index);
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(s: &str) -> f32 {
        s.chars().count() as f32 * 10.0
    }

    #[test]
    fn wraps_by_measured_width() {
        let lines = wrap_by_width("the quick brown fox jumps over", 100.0, &mono);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over"]);
        assert!(lines.iter().all(|l| mono(l) <= 100.0));
    }

    #[test]
    fn oversized_words_are_broken_up() {
        let lines = wrap_by_width("hi abcdefghijklmno", 50.0, &mono);
        assert_eq!(lines, vec!["hi", "abcde", "fghij", "klmno"]);
    }

    #[test]
    fn font_shrinks_until_text_fits() {
        let measure = |s: &str, px: f32| s.chars().count() as f32 * px * 0.5;
        let text = "a fairly long sentence that will not fit at the starting size at all";
        let (size, lines) = fit_text(text, 80.0, 400.0, 200.0, &measure);
        assert!(size < 80.0);
        assert!(lines.len() as f32 * size * LINE_SPACING <= 200.0);
        assert!(lines.iter().all(|l| measure(l, size) <= 400.0));

        let (size, lines) = fit_text("short", 80.0, 400.0, 200.0, &measure);
        assert_eq!(size, 80.0);
        assert_eq!(lines, vec!["short"]);
    }

    #[test]
    fn themes_fill_the_canvas() {
        let dark = blank_canvas(Theme::Dark, 4, 4);
        assert_eq!(dark.get_pixel(3, 3).0, [33, 32, 28, 255]);
        let clear = blank_canvas(Theme::Transparent, 4, 4);
        assert_eq!(clear.get_pixel(0, 0).0[3], 0);
        assert_eq!(palette(Theme::Light).background, [255, 255, 255, 255]);
    }

    #[test]
    fn blending_over_transparent_keeps_color() {
        let mut img = blank_canvas(Theme::Transparent, 2, 2);
        blend_pixel(&mut img, 0, 0, [255, 255, 255, 255], 255);
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        blend_pixel(&mut img, 1, 1, [200, 100, 0, 255], 128);
        let px = img.get_pixel(1, 1).0;
        assert_eq!(&px[..3], &[200, 100, 0]);
        assert_eq!(px[3], 128);
        blend_pixel(&mut img, 5, 5, [1, 2, 3, 255], 255);
    }

    #[test]
    fn missing_font_is_reported() {
        let err = TextPainter::load(Path::new("/nonexistent/font.ttf")).err().unwrap();
        assert!(err.to_string().contains("missing font"));
    }

    #[test]
    fn renders_with_a_system_font_when_available() {
        let candidates = [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/Library/Fonts/Arial Unicode.ttf",
        ];
        let Some(font) = candidates.iter().map(Path::new).find(|p| p.exists()) else {
            return;
        };
        let mut config = Config::default();
        config.settings.resolution_w = 360;
        config.settings.resolution_h = 640;
        config.settings.font_size = 32.0;
        let renderer = Renderer::new(TextPainter::load(font).unwrap(), &config);
        let chunk = TextChunk::new(4, ChunkKind::Body, "Hello from the renderer.".into(), 0..1);
        let dir = tempfile::tempdir().unwrap();
        let image = renderer.render_to_file(&chunk, dir.path()).unwrap();
        assert_eq!(image.path, dir.path().join("004.png"));
        let png = image::open(&image.path).unwrap().to_rgba8();
        assert_eq!(png.dimensions(), (360, 640));
        let background = palette(Theme::Dark).background;
        assert!(png.pixels().any(|p| p.0 != background));
        let again = renderer.render_chunk(&chunk);
        assert_eq!(again.as_raw(), png.as_raw());
    }
}
