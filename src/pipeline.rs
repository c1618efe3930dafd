use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::model::{ChunkKind, ProjectState, TextChunk, ThreadCandidate, VideoProject};
use crate::reddit::{ContentProvider, fetch_thread, load_used_ids, mark_used};
use crate::render::{Renderer, render_all};
use crate::segment::{segment, with_title};
use crate::tts::Narrator;
use crate::utils::{name_normalize, safe_id};
use crate::video::{Assembler, Compositor};
use anyhow::anyhow;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const FAILED_MARKER: &str = "FAILED";

/// What a single run ended with.
#[derive(Debug)]
pub enum RunOutcome {
    /// `--dry-run`: the thread and its chunks, nothing produced.
    Planned {
        thread: ThreadCandidate,
        chunks: Vec<TextChunk>,
    },
    Produced(VideoProject),
}

/// A run that did not produce a video.
#[derive(Debug)]
pub struct RunFailure {
    pub post_id: Option<String>,
    /// Present once the run directory exists; its state is `Failed(marker)`.
    pub project: Option<VideoProject>,
    pub error: PipelineError,
}

impl RunFailure {
    fn before_thread(error: PipelineError) -> Self {
        Self {
            post_id: None,
            project: None,
            error,
        }
    }

    fn for_post(id: &str, error: PipelineError) -> Self {
        Self {
            post_id: Some(id.to_string()),
            project: None,
            error,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub produced: Vec<PathBuf>,
    pub planned: usize,
    pub failed: Vec<(String, PipelineError)>,
}

impl BatchReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives runs end to end over injected collaborators.
pub struct Pipeline<P, C> {
    config: Config,
    provider: P,
    narrator: Arc<Narrator>,
    assembler: Arc<Assembler<C>>,
    renderer: Option<Arc<Renderer>>,
    dry_run: bool,
}

impl<P, C> Pipeline<P, C>
where
    P: ContentProvider,
    C: Compositor + 'static,
{
    pub fn new(config: Config, provider: P, narrator: Narrator, assembler: Assembler<C>) -> Self {
        Self {
            config,
            provider,
            narrator: Arc::new(narrator),
            assembler: Arc::new(assembler),
            renderer: None,
            dry_run: false,
        }
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn renderer(&self) -> Result<Arc<Renderer>> {
        match &self.renderer {
            Some(renderer) => Ok(Arc::clone(renderer)),
            None => Renderer::from_config(&self.config)
                .map(Arc::new)
                .map_err(|source| PipelineError::Render { chunk: 0, source }),
        }
    }

    /// Runs once per queued post id, or `times_to_run` times against the
    /// subreddit. A failed run is logged and the batch moves on.
    pub async fn run_batch(&self) -> BatchReport {
        let mut report = BatchReport::default();
        let mut attempted = HashSet::new();

        let post_ids = self.config.post_ids();
        let jobs: Vec<Option<String>> = if post_ids.is_empty() {
            (0..self.config.settings.times_to_run).map(|_| None).collect()
        } else {
            post_ids.into_iter().map(Some).collect()
        };

        let total = jobs.len();
        for (n, post_id) in jobs.into_iter().enumerate() {
            info!("Starting run {}/{}", n + 1, total);
            match self.run_once(post_id.as_deref(), &attempted).await {
                Ok(RunOutcome::Planned { thread, .. }) => {
                    attempted.insert(thread.id);
                    report.planned += 1;
                }
                Ok(RunOutcome::Produced(project)) => {
                    if let ProjectState::Completed(path) = project.state {
                        report.produced.push(path);
                    }
                }
                Err(failure) => {
                    let e = failure.error;
                    if e.is_no_content() {
                        warn!("Run {} produced nothing: {}", n + 1, e);
                    } else {
                        error!("Run {} failed: {}", n + 1, e);
                    }
                    let label = failure
                        .post_id
                        .or(post_id)
                        .unwrap_or_else(|| format!("run {}", n + 1));
                    attempted.insert(label.clone());
                    report.failed.push((label, e));
                }
            }
        }

        info!(
            "Batch finished: {} produced, {} planned, {} failed",
            report.produced.len(),
            report.planned,
            report.failed.len()
        );
        report
    }

    /// One run. `skip` holds post ids already attempted in this batch.
    pub async fn run_once(
        &self,
        post_id: Option<&str>,
        skip: &HashSet<String>,
    ) -> std::result::Result<RunOutcome, RunFailure> {
        let ledger = &self.config.settings.used_posts_path;
        let mut used = load_used_ids(ledger).unwrap_or_else(|e| {
            warn!("Could not read used post ledger {}: {:?}", ledger.display(), e);
            HashSet::new()
        });
        used.extend(skip.iter().cloned());

        let thread = fetch_thread(&self.provider, &self.config, post_id, &used)
            .await
            .map_err(RunFailure::before_thread)?;
        let id = thread.id.clone();

        let chunks = self.plan(&thread).map_err(|e| RunFailure::for_post(&id, e))?;
        if self.dry_run {
            for chunk in &chunks {
                info!(
                    "[dry run] chunk {} ({:?}, ~{:.1}s): {:.80}",
                    chunk.index, chunk.kind, chunk.estimated_seconds, chunk.text
                );
            }
            return Ok(RunOutcome::Planned { thread, chunks });
        }

        let work_dir = self.config.settings.results_dir.join(safe_id(&id));
        let output = work_dir.join(format!("{}.mp4", name_normalize(&thread.title)));
        let mut project = VideoProject::new(safe_id(&id), work_dir, output);

        match self.produce(&thread, &chunks, &mut project).await {
            Ok(path) => {
                mark_used(ledger, &id);
                project.state = ProjectState::Completed(path);
                Ok(RunOutcome::Produced(project))
            }
            Err(e) => {
                let marker = project.work_dir.join(FAILED_MARKER);
                if let Err(io) = fs::write(&marker, format!("{}\n", e)) {
                    warn!("Could not write {}: {}", marker.display(), io);
                }
                info!("Intermediate files kept in {}", project.work_dir.display());
                project.state = ProjectState::Failed(marker);
                Err(RunFailure {
                    post_id: Some(id),
                    project: Some(project),
                    error: e,
                })
            }
        }
    }

    /// Title chunks followed by the body or comment chunks.
    fn plan(&self, thread: &ThreadCandidate) -> Result<Vec<TextChunk>> {
        let settings = &self.config.settings;
        let body = segment(
            &thread.body,
            &thread.comments,
            settings.max_chunk_length,
            settings.storymode,
        );
        let chunks = with_title(&thread.title, settings.max_chunk_length, body);
        if !chunks.iter().any(|c| c.kind != ChunkKind::Title) {
            return Err(PipelineError::no_content(format!(
                "post {} has no narratable text",
                thread.id
            )));
        }
        info!("Split story into {} chunks", chunks.len());
        debug!(
            "First chunk preview: {}",
            chunks[0].text.chars().take(100).collect::<String>()
        );
        Ok(chunks)
    }

    async fn produce(
        &self,
        thread: &ThreadCandidate,
        chunks: &[TextChunk],
        project: &mut VideoProject,
    ) -> Result<PathBuf> {
        prepare_dir(&project.work_dir)?;
        fs::create_dir_all(project.images_dir())?;
        fs::create_dir_all(project.audio_dir())?;
        info!("Created run directory '{}'", project.work_dir.display());

        let background = &self.config.settings.background;
        project.background_video = background.video.clone();
        project.background_audio = background.audio.clone();

        let narrator = Arc::clone(&self.narrator);
        let owned: Vec<TextChunk> = chunks.to_vec();
        let audio_dir = project.audio_dir();
        let synthesis = tokio::task::spawn_blocking(move || {
            let mut rng = StdRng::from_entropy();
            narrator.synthesize_chunks(&owned, &audio_dir, &mut rng)
        });

        let renderer = self.renderer()?;
        let images = render_all(Arc::clone(&renderer), chunks, &project.images_dir()).await;

        let outcome = synthesis.await.map_err(|e| PipelineError::Synthesis {
            chunk: 0,
            backend: "narrator".into(),
            source: anyhow!("synthesis task panicked: {}", e),
        })?;
        project.clips = outcome.into_result()?;
        project.images = images?;
        info!(
            "Narration ready: {} clips, {:.1}s",
            project.clips.len(),
            project.total_narration()
        );

        if background.thumbnail {
            project.thumbnail = Some(self.thumbnail(renderer, thread, &project.work_dir).await?);
        }

        let assembler = Arc::clone(&self.assembler);
        let job = project.clone();
        let owned: Vec<TextChunk> = chunks.to_vec();
        tokio::task::spawn_blocking(move || assembler.assemble(&job, &owned))
            .await
            .map_err(|e| PipelineError::assembly(format!("assembly task panicked: {}", e)))?
    }

    async fn thumbnail(
        &self,
        renderer: Arc<Renderer>,
        thread: &ThreadCandidate,
        work_dir: &Path,
    ) -> Result<PathBuf> {
        let title = thread.title.clone();
        let channel = self.config.settings.channel_name.clone();
        let background = self.config.settings.background.thumbnail_image.clone();
        let out = work_dir.join("thumbnail.png");
        tokio::task::spawn_blocking(move || {
            renderer.render_thumbnail(&title, &channel, background.as_deref(), &out)
        })
        .await
        .map_err(|e| PipelineError::Render {
            chunk: 0,
            source: anyhow!("thumbnail task panicked: {}", e),
        })?
        .map_err(|source| PipelineError::Render { chunk: 0, source })
    }
}

/// Clears leftovers of an earlier attempt at the same post.
fn prepare_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        info!("Removing existing run directory '{}'", dir.display());
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}
