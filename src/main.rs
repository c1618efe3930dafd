use clap::Parser;
use reddit_video_maker::args::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    reddit_video_maker::run(args).await
}
