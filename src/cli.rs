use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Store directory (default: `TXTSHELF_DATA_DIR` or `txtshelf-data`).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Chapters per stored chunk before a document is split.
    #[arg(long, global = true)]
    pub max_chapters_per_chunk: Option<usize>,

    /// Split every N lines instead of by chapters.
    #[arg(long, global = true)]
    pub split_lines: Option<usize>,

    /// Treat whole-line uppercase text as a heading.
    #[arg(long, global = true)]
    pub uppercase_headings: bool,

    /// Seconds between position saves while reading.
    #[arg(long, global = true)]
    pub capture_interval_secs: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Segment a text file (or stdin) and store it.
    Import(ImportArgs),
    /// Print the detected table of contents as YAML.
    Toc(TocArgs),
    /// Print the rendered markup of a text file.
    Render(RenderArgs),
    /// List stored books and their documents.
    List,
    /// Show where reading would resume for a stored document.
    Open(OpenArgs),
    /// Save a reading position for a stored document.
    Progress(ProgressArgs),
    /// Follow a reading session fed from stdin, one `<scroll> [chapter]` per line.
    Read(ReadArgs),
    /// Delete a stored document (and its history) or a whole book.
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Plain-text file to import.
    #[arg(long, conflicts_with = "stdin", required_unless_present = "stdin")]
    pub file: Option<PathBuf>,

    /// Read pasted content from stdin.
    #[arg(long)]
    pub stdin: bool,

    /// Display name for the book.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct TocArgs {
    /// Plain-text file to scan.
    #[arg(long)]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Plain-text file to render.
    #[arg(long)]
    pub file: PathBuf,

    /// Output path (default: stdout).
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct OpenArgs {
    /// Document id.
    #[arg(long)]
    pub id: uuid::Uuid,
}

#[derive(Debug, Args)]
pub struct ProgressArgs {
    /// Document id.
    #[arg(long)]
    pub id: uuid::Uuid,

    /// Scroll offset to save.
    #[arg(long)]
    pub scroll: f64,

    /// Current chapter ordinal (default: first chapter).
    #[arg(long)]
    pub chapter: Option<usize>,

    /// Seconds read since the last save.
    #[arg(long, default_value_t = 0.0)]
    pub elapsed: f64,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Document id.
    #[arg(long)]
    pub id: uuid::Uuid,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Document id.
    #[arg(long, conflicts_with = "group", required_unless_present = "group")]
    pub id: Option<uuid::Uuid>,

    /// Book (group) id; removes every document in it.
    #[arg(long)]
    pub group: Option<uuid::Uuid>,
}
