mod cli;

use anyhow::Result;
use clip_notes::timeline::TimeRange;
use clip_notes::video::export_previews;
use clip_notes::web::server::run_server;
use cli::{Args, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse_args();

    match args.command {
        Command::Serve {
            host,
            port,
            comments_root,
        } => run_server(host, port, comments_root).await?,
        Command::Preview {
            frames_dir,
            fps,
            start,
            end,
            count,
            output_dir,
        } => {
            let range = TimeRange::ordered(start, end);
            let written = export_previews(&frames_dir, fps, range, count, &output_dir).await?;
            for path in written {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}
