use clap::Parser;

#[derive(Parser)]
#[command(
    name = "ytstudy",
    about = "YouTube transcript and study-notes service",
    version
)]
pub struct Cli {
    /// Address to listen on [default: 127.0.0.1:3000]
    #[arg(short, long)]
    pub bind: Option<String>,

    /// LLM model for summaries, flashcards and chat [default: gemini-1.5-flash]
    #[arg(short, long)]
    pub model: Option<String>,

    /// Preferred caption language [default: en]
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Per-strategy upstream timeout in seconds [default: 10]
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Base URL for YouTube requests
    #[arg(long)]
    pub youtube_base_url: Option<String>,

    /// Echo resolved settings to stderr on startup
    #[arg(short, long)]
    pub verbose: bool,
}
