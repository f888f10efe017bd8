use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the comment persistence service
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,

        /// Port to bind to; the next free port is used if taken
        #[arg(long, default_value_t = 5000)]
        port: u16,

        /// Directory holding one <videoName>.json per video
        #[arg(long, env = "CLIP_NOTES_COMMENTS_ROOT", default_value = "comment-json")]
        comments_root: PathBuf,
    },

    /// Write preview thumbnails for a time range of a frame directory
    Preview {
        /// Directory of extracted frames (frame_001.jpg, ...)
        #[arg(long)]
        frames_dir: PathBuf,

        /// Rate the frames were extracted at
        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        /// Range start in seconds
        #[arg(long)]
        start: f64,

        /// Range end in seconds
        #[arg(long)]
        end: f64,

        /// Number of thumbnails (2 to 120)
        #[arg(long, default_value_t = 5)]
        count: usize,

        /// Where preview_NNN.jpg files are written
        #[arg(long)]
        output_dir: PathBuf,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
