//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reqwest::Url;
use seedforge_api_models::{ListingSource, TorrentFormat};
use uuid::Uuid;

use crate::client::{CliDependencies, CliResult, parse_url};
use crate::commands::content::{
    handle_browse, handle_map, handle_mappings, handle_pieces, handle_roots, handle_scan,
};
use crate::commands::creations::{
    handle_cancel, handle_create, handle_download, handle_list, handle_status,
};
use crate::commands::remote::{handle_health, handle_remote_test};
use crate::commands::tail::handle_tail;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_API_URL: &str = "http://127.0.0.1:8094";

/// Parses CLI arguments, executes the requested command, and reports the outcome.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    let deps = match CliDependencies::from_env(&cli, &trace_id) {
        Ok(deps) => deps,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    let telemetry = deps.telemetry.clone();

    let result = dispatch(cli, &deps).await;

    let (exit_code, message, outcome) = match result {
        Ok(()) => (0, None, "success"),
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            eprintln!("error: {message}");
            (exit_code, Some(message), "error")
        }
    };

    if let Some(emitter) = &telemetry {
        emitter
            .emit(
                &trace_id,
                command_name,
                outcome,
                exit_code,
                message.as_deref(),
            )
            .await;
    }

    exit_code
}

async fn dispatch(cli: Cli, deps: &CliDependencies) -> CliResult<()> {
    let ctx = deps.context(cli.api_url);
    let format = cli.format;

    match cli.command {
        Command::Scan(args) => handle_scan(&ctx, args, format).await,
        Command::Pieces(args) => handle_pieces(&ctx, args, format).await,
        Command::Browse(args) => handle_browse(&ctx, args, format).await,
        Command::Roots => handle_roots(&ctx, format).await,
        Command::Mappings => handle_mappings(&ctx, format).await,
        Command::Map(args) => handle_map(&ctx, args, format).await,
        Command::Create(args) => handle_create(&ctx, args, format).await,
        Command::List => handle_list(&ctx, format).await,
        Command::Status(args) => handle_status(&ctx, args, format).await,
        Command::Cancel(args) => handle_cancel(&ctx, args, format).await,
        Command::Download(args) => handle_download(&ctx, args).await,
        Command::Remote(RemoteCommand::Test) => handle_remote_test(&ctx, format).await,
        Command::Health => handle_health(&ctx, format).await,
        Command::Tail(args) => handle_tail(&ctx, args).await,
    }
}

#[derive(Parser)]
#[command(
    name = "seedforge",
    about = "Create torrents through a qBittorrent instance via the seedforge API"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "SEEDFORGE_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "SEEDFORGE_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long = "format",
        alias = "output-format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) format: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Analyse a file or folder.
    Scan(ScanArgs),
    /// Compute a piece size plan.
    Pieces(PiecesArgs),
    /// List a directory.
    Browse(BrowseArgs),
    /// Show the starting points for browsing.
    Roots,
    /// Show the configured path mappings and their diagnostics.
    Mappings,
    /// Translate a path between the host and remote namespaces.
    Map(MapArgs),
    /// Start a torrent creation job.
    Create(CreateArgs),
    /// List creation jobs.
    List,
    /// Show a creation job.
    Status(JobArgs),
    /// Cancel a creation job.
    Cancel(JobArgs),
    /// Download the torrent produced by a job.
    Download(DownloadArgs),
    /// Remote client commands.
    #[command(subcommand)]
    Remote(RemoteCommand),
    /// Show server health.
    Health,
    /// Follow the server event stream.
    Tail(TailArgs),
}

#[derive(Subcommand)]
pub(crate) enum RemoteCommand {
    /// Verify credentials and report the remote client version.
    Test,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum SourceArg {
    #[default]
    Local,
    Remote,
}

impl From<SourceArg> for ListingSource {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Local => Self::Local,
            SourceArg::Remote => Self::Remote,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum FormatArg {
    V1,
    V2,
    Hybrid,
}

impl From<FormatArg> for TorrentFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::V1 => Self::V1,
            FormatArg::V2 => Self::V2,
            FormatArg::Hybrid => Self::Hybrid,
        }
    }
}

#[derive(Args)]
pub(crate) struct ScanArgs {
    #[arg(help = "Absolute path to analyse")]
    pub(crate) path: String,
    #[arg(long, value_enum, default_value_t = SourceArg::Local)]
    pub(crate) source: SourceArg,
}

#[derive(Args)]
pub(crate) struct PiecesArgs {
    #[arg(help = "Content size in bytes")]
    pub(crate) total_bytes: u64,
    #[arg(long, help = "Piece count to aim for (server default when omitted)")]
    pub(crate) target: Option<u64>,
    #[arg(long, help = "Manual piece size in bytes")]
    pub(crate) piece_size: Option<u64>,
}

#[derive(Args, Default)]
pub(crate) struct BrowseArgs {
    #[arg(help = "Directory to list (defaults to /)")]
    pub(crate) path: Option<String>,
    #[arg(long, value_enum, default_value_t = SourceArg::Local)]
    pub(crate) source: SourceArg,
}

#[derive(Args)]
pub(crate) struct MapArgs {
    #[arg(help = "Path to translate")]
    pub(crate) path: String,
    #[arg(long, help = "Translate a remote path back to the host namespace")]
    pub(crate) to_host: bool,
}

#[derive(Args, Default)]
pub(crate) struct CreateArgs {
    #[arg(help = "Content path")]
    pub(crate) path: String,
    #[arg(long, value_enum, help = "Namespace of the path (server default when omitted)")]
    pub(crate) source: Option<SourceArg>,
    #[arg(long, value_enum, help = "Metainfo layout")]
    pub(crate) torrent_format: Option<FormatArg>,
    #[arg(long, help = "Manual piece size in bytes")]
    pub(crate) piece_size: Option<u64>,
    #[arg(long, help = "Ignore a configured fixed piece size and size automatically")]
    pub(crate) auto_piece_size: bool,
    #[arg(long, help = "Piece count to aim for in automatic mode")]
    pub(crate) target_pieces: Option<u64>,
    #[arg(long, help = "Mark the torrent private")]
    pub(crate) private: Option<bool>,
    #[arg(long, help = "Add the torrent to qBittorrent for seeding")]
    pub(crate) seed: Option<bool>,
    #[arg(long, help = "Disable share limits while seeding")]
    pub(crate) ignore_share_ratio: Option<bool>,
    #[arg(long, help = "Align files to piece boundaries")]
    pub(crate) optimize_alignment: Option<bool>,
    #[arg(long, help = "Padding threshold in bytes when aligning")]
    pub(crate) padded_file_size_limit: Option<u64>,
    #[arg(
        long = "tracker",
        help = "Tracker tier; separate URLs of one tier with commas, repeat for more tiers"
    )]
    pub(crate) trackers: Vec<String>,
    #[arg(long = "web-seed", help = "Web seed URL; repeat for more")]
    pub(crate) web_seeds: Vec<String>,
    #[arg(long)]
    pub(crate) comment: Option<String>,
    #[arg(long = "source-tag")]
    pub(crate) source_tag: Option<String>,
    #[arg(long, help = "Wait for the job and print progress")]
    pub(crate) follow: bool,
    #[arg(long, help = "Write the finished torrent here (implies --follow)")]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct JobArgs {
    #[arg(help = "Job identifier")]
    pub(crate) id: Uuid,
}

#[derive(Args)]
pub(crate) struct DownloadArgs {
    #[arg(help = "Job identifier")]
    pub(crate) id: Uuid,
    #[arg(long, help = "Destination file or directory (defaults to the suggested name)")]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Default)]
pub(crate) struct TailArgs {
    #[arg(long, value_delimiter = ',', help = "Filter to job IDs")]
    pub(crate) job: Vec<Uuid>,
    #[arg(long, value_delimiter = ',', help = "Filter to event kinds")]
    pub(crate) event: Vec<String>,
    #[arg(long, help = "Persist Last-Event-ID to this file")]
    pub(crate) resume_file: Option<PathBuf>,
    #[arg(
        long,
        default_value_t = 5,
        help = "Seconds to wait before reconnecting"
    )]
    pub(crate) retry_secs: u64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub(crate) const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Scan(_) => "scan",
        Command::Pieces(_) => "pieces",
        Command::Browse(_) => "browse",
        Command::Roots => "roots",
        Command::Mappings => "mappings",
        Command::Map(_) => "map",
        Command::Create(_) => "create",
        Command::List => "list",
        Command::Status(_) => "status",
        Command::Cancel(_) => "cancel",
        Command::Download(_) => "download",
        Command::Remote(RemoteCommand::Test) => "remote_test",
        Command::Health => "health",
        Command::Tail(_) => "tail",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_the_subcommand() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "seedforge",
            "scan",
            "/mnt/media/show",
            "--source",
            "remote",
            "--format",
            "json",
            "--api-url",
            "http://seedforge.local:9000",
        ])?;
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.api_url.as_str(), "http://seedforge.local:9000/");
        match cli.command {
            Command::Scan(args) => {
                assert_eq!(args.path, "/mnt/media/show");
                assert_eq!(args.source, SourceArg::Remote);
            }
            _ => anyhow::bail!("expected scan"),
        }
        Ok(())
    }

    #[test]
    fn create_collects_repeated_tiers() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "seedforge",
            "create",
            "/mnt/media/show",
            "--tracker",
            "https://a.example/announce,https://b.example/announce",
            "--tracker",
            "https://c.example/announce",
            "--private",
            "true",
            "--output",
            "/tmp/show.torrent",
        ])?;
        let Command::Create(args) = cli.command else {
            anyhow::bail!("expected create");
        };
        assert_eq!(args.trackers.len(), 2);
        assert_eq!(args.private, Some(true));
        assert!(args.output.is_some());
        assert_eq!(command_label(&Command::Create(args)), "create");
        Ok(())
    }

    #[test]
    fn remote_test_is_a_nested_command() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["seedforge", "remote", "test"])?;
        assert_eq!(command_label(&cli.command), "remote_test");
        Ok(())
    }

    #[test]
    fn invalid_api_url_is_rejected() {
        assert!(Cli::try_parse_from(["seedforge", "--api-url", "not a url", "health"]).is_err());
    }
}
