use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reddit-video-maker", version, about = "Turn Reddit threads into narrated vertical videos")]
pub struct Args {
    /// TOML configuration file.
    #[clap(long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Post id(s) to render instead of picking from the subreddit; join several with `+`.
    #[clap(long)]
    pub post_id: Option<String>,

    /// Number of videos to make from the subreddit.
    #[clap(long)]
    pub times: Option<u32>,

    #[clap(short, long)]
    pub verbose: bool,

    /// Fetch and segment only; print the plan without producing media.
    #[clap(long)]
    pub dry_run: bool,
}
