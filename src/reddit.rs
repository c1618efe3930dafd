use crate::config::{Config, TieBreak};
use crate::error::{PipelineError, Result};
use crate::model::{Comment, ThreadCandidate};
use crate::similarity::{best_indices, keyword_similarity};
use crate::utils::{contains_blocked_word, sanitize_text, truncate_at_word};
use anyhow::{Context, bail};
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const UA: &str = "reddit-video-maker/0.1 (story narration bot)";

#[derive(Debug, Deserialize)]
pub struct RedditListing<T> {
    pub data: RedditListingData<T>,
}

#[derive(Debug, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditChild<T>>,
}

#[derive(Debug, Deserialize)]
pub struct RedditChild<T> {
    #[serde(default)]
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subreddit: String,
    pub is_self: Option<bool>,
    pub over_18: Option<bool>,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub permalink: String,
}

/// A `t1` comment or a `more` stub; stubs deserialize with empty fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RedditComment {
    pub id: String,
    pub body: String,
    pub score: i64,
    pub depth: u32,
    pub author: Option<String>,
    pub stickied: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

impl From<RedditPost> for ThreadCandidate {
    fn from(post: RedditPost) -> Self {
        let body = if post.is_self.unwrap_or(true) {
            post.selftext.trim().to_string()
        } else {
            String::new()
        };
        ThreadCandidate {
            subreddit: post.subreddit,
            id: post.id,
            title: post.title.trim().to_string(),
            body,
            author: post.author,
            comments: Vec::new(),
            nsfw: post.over_18.unwrap_or(false),
            language: None,
            num_comments: post.num_comments,
            score: post.score,
            permalink: post.permalink,
        }
    }
}

/// Read-only access to posts and comments.
pub trait ContentProvider {
    /// Hot posts of a subreddit expression (`a` or `a+b`), without comments.
    fn hot(
        &self,
        subreddit: &str,
        limit: usize,
    ) -> impl Future<Output = anyhow::Result<Vec<ThreadCandidate>>> + Send;

    /// One post with its comment tree flattened in provider order.
    fn thread(&self, post_id: &str) -> impl Future<Output = anyhow::Result<ThreadCandidate>> + Send;
}

pub struct RedditClient {
    client: reqwest::Client,
    token: Option<String>,
}

impl RedditClient {
    /// Logs in with the configured script-app credentials, or stays anonymous
    /// and uses the public JSON endpoints when none are set.
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .build()
            .map_err(|e| PipelineError::provider("building http client", e))?;

        if !config.has_credentials() {
            info!("No reddit credentials configured; using public endpoints");
            return Ok(Self { client, token: None });
        }

        info!("Logging into Reddit as u/{}", config.reddit.creds.username);
        let token = login(&client, config)
            .await
            .map_err(|e| PipelineError::provider("logging into reddit", e))?;
        Ok(Self {
            client,
            token: Some(token),
        })
    }

    fn url(&self, path: &str) -> String {
        match self.token {
            Some(_) => format!("https://oauth.reddit.com{}", path),
            None => format!("https://www.reddit.com{}.json", path),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<T> {
        let mut request = self
            .client
            .get(self.url(path))
            .query(query)
            .header(USER_AGENT, UA);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let res = request.send().await?.error_for_status()?.text().await?;
        serde_json::from_str(&res).with_context(|| format!("parsing reddit response for {}", path))
    }
}

async fn login(client: &reqwest::Client, config: &Config) -> anyhow::Result<String> {
    let creds = &config.reddit.creds;
    let password = if creds.two_fa {
        let code = std::env::var("REDDIT_2FA_CODE")
            .context("two-factor auth is enabled; set REDDIT_2FA_CODE to the current code")?;
        format!("{}:{}", creds.password, code.trim())
    } else {
        creds.password.clone()
    };

    let res: TokenResponse = client
        .post("https://www.reddit.com/api/v1/access_token")
        .basic_auth(&creds.client_id, Some(&creds.client_secret))
        .header(USER_AGENT, UA)
        .form(&[
            ("grant_type", "password"),
            ("username", creds.username.as_str()),
            ("password", password.as_str()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    match (res.access_token, res.error) {
        (Some(token), _) => Ok(token),
        (None, Some(error)) => bail!("reddit rejected the credentials: {}", error),
        (None, None) => bail!("reddit returned no access token"),
    }
}

impl ContentProvider for RedditClient {
    async fn hot(&self, subreddit: &str, limit: usize) -> anyhow::Result<Vec<ThreadCandidate>> {
        let listing: RedditListing<RedditPost> = self
            .get_json(
                &format!("/r/{}/hot", subreddit),
                &[("limit", limit.to_string()), ("raw_json", "1".to_string())],
            )
            .await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| ThreadCandidate::from(child.data))
            .collect())
    }

    async fn thread(&self, post_id: &str) -> anyhow::Result<ThreadCandidate> {
        let (post, comments): (RedditListing<RedditPost>, RedditListing<RedditComment>) = self
            .get_json(
                &format!("/comments/{}", post_id),
                &[
                    ("depth", "1".to_string()),
                    ("sort", "top".to_string()),
                    ("raw_json", "1".to_string()),
                ],
            )
            .await?;
        let post = post
            .data
            .children
            .into_iter()
            .next()
            .with_context(|| format!("post {} not found", post_id))?;
        let mut thread = ThreadCandidate::from(post.data);
        thread.comments = comments
            .data
            .children
            .into_iter()
            .filter(|child| child.kind == "t1")
            .map(|child| {
                let c = child.data;
                Comment {
                    id: c.id,
                    body: c.body,
                    score: c.score,
                    depth: c.depth,
                    author: c.author.filter(|a| a != "[deleted]"),
                    stickied: c.stickied,
                }
            })
            .collect();
        Ok(thread)
    }
}

/// Thresholds the fetcher applies to candidates and their comments.
#[derive(Debug, Clone)]
pub struct FetchFilters {
    pub allow_nsfw: bool,
    pub min_comments: u64,
    pub min_comment_length: usize,
    pub max_comment_length: usize,
    pub language: Option<String>,
    pub blocked_words: Vec<String>,
    pub storymode: bool,
    pub keywords: Option<Vec<String>>,
    pub tie_break: TieBreak,
}

impl FetchFilters {
    pub fn from_config(config: &Config) -> Self {
        let thread = &config.reddit.thread;
        let lang = thread.post_lang.trim();
        let keywords = config.similarity_keywords();
        Self {
            allow_nsfw: thread.allow_nsfw,
            min_comments: thread.min_comments,
            min_comment_length: thread.min_comment_length,
            max_comment_length: thread.max_comment_length,
            language: (!lang.is_empty()).then(|| lang.to_string()),
            blocked_words: thread.blocked_words.clone(),
            storymode: config.settings.storymode,
            keywords: (config.ai.ai_similarity_enabled && !keywords.is_empty()).then_some(keywords),
            tie_break: config.ai.tie_break,
        }
    }

    /// Why a candidate is rejected, or `None` if it passes.
    pub fn rejection(&self, c: &ThreadCandidate, used: &HashSet<String>) -> Option<String> {
        if c.nsfw && !self.allow_nsfw {
            return Some("nsfw".to_string());
        }
        if used.contains(&c.id) {
            return Some("already used".to_string());
        }
        if c.num_comments < self.min_comments {
            return Some(format!(
                "{} comments, need {}",
                c.num_comments, self.min_comments
            ));
        }
        if let (Some(want), Some(have)) = (&self.language, &c.language) {
            if !want.eq_ignore_ascii_case(have) {
                return Some(format!("language {}", have));
            }
        }
        if self.storymode && c.body.trim().is_empty() {
            return Some("no post body for storymode".to_string());
        }
        let text = format!("{} {}", c.title, c.body);
        if let Some(word) = contains_blocked_word(&text, &self.blocked_words) {
            return Some(format!("blocked word `{}`", word));
        }
        None
    }
}

/// Picks one candidate out of `candidates` (provider order, hottest first).
/// Returns the candidate and its similarity score when ranking is enabled.
pub fn select_candidate<R: Rng>(
    candidates: Vec<ThreadCandidate>,
    filters: &FetchFilters,
    used: &HashSet<String>,
    rng: &mut R,
) -> Result<(ThreadCandidate, Option<f64>)> {
    let total = candidates.len();
    let mut survivors: Vec<ThreadCandidate> = candidates
        .into_iter()
        .filter(|c| match filters.rejection(c, used) {
            Some(reason) => {
                debug!("Skipping post {} ({}): {}", c.id, reason, c.title);
                false
            }
            None => true,
        })
        .collect();

    if survivors.is_empty() {
        return Err(PipelineError::no_content(format!(
            "all {} candidate posts were filtered out",
            total
        )));
    }

    let Some(keywords) = &filters.keywords else {
        return Ok((survivors.swap_remove(0), None));
    };

    info!("Sorting {} posts by similarity to: {}", survivors.len(), keywords.join(", "));
    let scores: Vec<f64> = survivors
        .iter()
        .map(|c| keyword_similarity(&format!("{} {}", c.title, c.body), keywords))
        .collect();
    let best = best_indices(&scores);
    let pick = match filters.tie_break {
        TieBreak::ProviderOrder => best[0],
        TieBreak::Random => *best.choose(rng).unwrap_or(&best[0]),
    };
    if best.len() > 1 {
        debug!("{} posts tied at score {:.3}; picked #{}", best.len(), scores[pick], pick);
    }
    let score = scores[pick];
    Ok((survivors.swap_remove(pick), Some(score)))
}

/// Top-level, readable comments within the length bounds; long ones are cut
/// at a word boundary. Provider order is kept.
pub fn filter_comments(comments: Vec<Comment>, filters: &FetchFilters) -> Vec<Comment> {
    comments
        .into_iter()
        .filter(|c| c.depth == 0 && !c.stickied && c.author.is_some())
        .filter(|c| !matches!(c.body.trim(), "[removed]" | "[deleted]"))
        .filter(|c| !sanitize_text(&c.body).is_empty())
        .filter(|c| c.body.chars().count() >= filters.min_comment_length)
        .map(|mut c| {
            if c.body.chars().count() > filters.max_comment_length {
                c.body = truncate_at_word(&c.body, filters.max_comment_length);
            }
            c
        })
        .collect()
}

/// Selects a thread (or loads `post_id` directly) and attaches its qualifying comments.
pub async fn fetch_thread<P: ContentProvider>(
    provider: &P,
    config: &Config,
    post_id: Option<&str>,
    used: &HashSet<String>,
) -> Result<ThreadCandidate> {
    let filters = FetchFilters::from_config(config);

    let mut thread = match post_id {
        Some(id) => {
            info!("Fetching requested post {}", id);
            provider
                .thread(id)
                .await
                .map_err(|e| PipelineError::provider(format!("fetching post {}", id), e))?
        }
        None => {
            let subreddit = &config.reddit.thread.subreddit;
            info!(
                "Fetching reddit stories from r/{} (up to {} posts)",
                subreddit, config.reddit.thread.fetch_limit
            );
            let candidates = provider
                .hot(subreddit, config.reddit.thread.fetch_limit)
                .await
                .map_err(|e| PipelineError::provider(format!("listing r/{}", subreddit), e))?;
            let (picked, score) = {
                let mut rng = rand::thread_rng();
                select_candidate(candidates, &filters, used, &mut rng)?
            };
            if let Some(score) = score {
                info!("Post similarity score: {:.0}%", score * 100.0);
            }
            let full = provider
                .thread(&picked.id)
                .await
                .map_err(|e| PipelineError::provider(format!("fetching post {}", picked.id), e))?;
            ThreadCandidate {
                comments: full.comments,
                ..picked
            }
        }
    };

    let raw = thread.comments.len();
    thread.comments = filter_comments(std::mem::take(&mut thread.comments), &filters);
    info!(
        "Selected post: {} ({} of {} comments usable)",
        thread.title,
        thread.comments.len(),
        raw
    );
    info!("Thread url is: {}", thread.url());

    if !filters.storymode && thread.comments.is_empty() {
        return Err(PipelineError::no_content(format!(
            "post {} has no qualifying comments",
            thread.id
        )));
    }
    Ok(thread)
}

pub fn load_used_ids(path: &Path) -> anyhow::Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let data = fs::read_to_string(path)?;
    let ids: Vec<String> = serde_json::from_str(&data)
        .with_context(|| format!("parsing used post ledger {}", path.display()))?;
    Ok(ids.into_iter().collect())
}

pub fn save_used_ids(path: &Path, ids: &HashSet<String>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut sorted: Vec<&String> = ids.iter().collect();
    sorted.sort();
    let data = serde_json::to_string_pretty(&sorted)?;
    fs::write(path, data)?;
    Ok(())
}

/// Records a finished post so later runs skip it. Ledger problems are logged, not fatal.
pub fn mark_used(path: &Path, id: &str) {
    let result = load_used_ids(path).and_then(|mut ids| {
        ids.insert(id.to_string());
        save_used_ids(path, &ids)
    });
    if let Err(e) = result {
        warn!("Could not update used post ledger {}: {:?}", path.display(), e);
    }
}
