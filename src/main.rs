use clap::{
    Args, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotyt::{
    cli::{self, CopySettings, Selection},
    config, error,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check Spotify and YouTube Music API quotas
    Check,

    /// List your Spotify playlists
    Playlists,

    /// Copy playlists, liked songs or followed artists to YouTube Music
    Copy(CopyOptions),

    /// Inspect or clear saved progress of interrupted transfers
    Progress(ProgressOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct CopyOptions {
    #[command(subcommand)]
    pub command: CopySubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CopySubcommand {
    /// Copy playlists
    Playlists(CopyPlaylistsOpts),

    /// Copy liked songs into "Liked Songs from Spotify"
    Liked(TransferArgs),

    /// Subscribe to your followed artists
    Artists,
}

#[derive(Parser, Debug, Clone)]
pub struct CopyPlaylistsOpts {
    /// Copy every playlist
    #[clap(long, conflicts_with = "select")]
    pub all: bool,

    /// Playlists to copy by list number, e.g. "1,3-5"
    #[clap(long)]
    pub select: Option<String>,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

#[derive(Args, Debug, Clone)]
pub struct TransferArgs {
    /// Tracks per add request (1-20)
    #[clap(long, value_parser = clap::value_parser!(u64).range(1..=20))]
    pub batch_size: Option<u64>,

    /// Attempts per batch
    #[clap(long)]
    pub retries: Option<u32>,

    /// Seconds between batches
    #[clap(long)]
    pub batch_delay: Option<u64>,

    /// Seconds to wait before the final verification
    #[clap(long)]
    pub verification_delay: Option<u64>,

    /// Verify every batch and retry only the missing tracks
    #[clap(long)]
    pub verify_each_batch: bool,

    /// Do not probe API quotas before copying
    #[clap(long)]
    pub skip_quota_check: bool,
}

impl From<TransferArgs> for CopySettings {
    fn from(args: TransferArgs) -> Self {
        CopySettings {
            batch_size: args.batch_size.map(|n| n as usize),
            retries: args.retries,
            batch_delay: args.batch_delay,
            verification_delay: args.verification_delay,
            verify_each_batch: args.verify_each_batch,
            skip_quota_check: args.skip_quota_check,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ProgressOptions {
    #[command(subcommand)]
    pub command: ProgressSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProgressSubcommand {
    /// List saved transfers
    List,

    /// Delete saved progress
    Clear(ProgressClearOpts),
}

#[derive(Parser, Debug, Clone)]
pub struct ProgressClearOpts {
    /// Transfer name (playlist name)
    #[clap(conflicts_with = "all")]
    pub name: Option<String>,

    /// Delete all saved progress
    #[clap(long)]
    pub all: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Check => cli::check().await,
        Command::Playlists => cli::list_playlists().await,
        Command::Copy(opt) => match opt.command {
            CopySubcommand::Playlists(p) => {
                let selection = match (p.all, p.select) {
                    (true, _) => Selection::All,
                    (false, Some(input)) => Selection::Indices(input),
                    (false, None) => Selection::Prompt,
                };
                cli::copy_playlists(selection, p.transfer.into()).await
            }
            CopySubcommand::Liked(args) => cli::copy_liked(args.into()).await,
            CopySubcommand::Artists => cli::copy_artists().await,
        },
        Command::Progress(opt) => match opt.command {
            ProgressSubcommand::List => cli::list_progress().await,
            ProgressSubcommand::Clear(c) => cli::clear_progress(c.name, c.all).await,
        },
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
