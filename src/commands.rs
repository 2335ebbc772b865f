use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use chrono::Utc;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt as _, AsyncReadExt as _};
use uuid::Uuid;

use crate::chunk::split_document;
use crate::cli::{
    DeleteArgs, GlobalArgs, ImportArgs, OpenArgs, ProgressArgs, ReadArgs, RenderArgs, TocArgs,
};
use crate::config::ReaderConfig;
use crate::formats::{ChapterRef, TocEntry};
use crate::import::{ImportOptions, ImportRequest, import_file, import_text};
use crate::position::{InitialPosition, capture_current_position, toc_entries};
use crate::segment::segment;
use crate::session::{Neighbors, ReadingSession, neighbors, open_document};
use crate::store::{DocumentStore, LocalFsStore};

/// Environment first, then command-line flags.
pub fn resolve_config(global: &GlobalArgs) -> ReaderConfig {
    apply_flags(ReaderConfig::from_env(), global)
}

/// Flags replace configured values. Zero counts are treated like an unset
/// flag, the same way zero is treated in the environment.
pub fn apply_flags(mut config: ReaderConfig, global: &GlobalArgs) -> ReaderConfig {
    if let Some(dir) = &global.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(max) = global.max_chapters_per_chunk.filter(|v| *v > 0) {
        config.max_chapters_per_chunk = max;
    }
    if let Some(lines) = global.split_lines.filter(|v| *v > 0) {
        config.split_lines = Some(lines);
    }
    if global.uppercase_headings {
        config.uppercase_headings = true;
    }
    if let Some(secs) = global.capture_interval_secs.filter(|v| *v > 0) {
        config.capture_interval = Duration::from_secs(secs);
    }
    config
}

pub async fn import(args: ImportArgs, config: &ReaderConfig) -> anyhow::Result<()> {
    let store = LocalFsStore::open(&config.data_dir)
        .await
        .context("open store")?;
    let options = ImportOptions {
        rules: config.heading_rules(),
        policy: config.split_policy(),
    };

    let outcome = match &args.file {
        Some(path) => import_file(&store, path, args.name, &options).await?,
        None => {
            let mut raw_text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw_text)
                .await
                .context("read stdin")?;
            let request = ImportRequest {
                raw_text,
                name: args.name,
                file_name: None,
            };
            import_text(&store, request, &options).await?
        }
    };

    print_json(&outcome)
}

#[derive(Debug, Serialize)]
struct TocListing {
    source: String,
    chunks: Vec<TocChunk>,
}

#[derive(Debug, Serialize)]
struct TocChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_chunks: Option<usize>,
    first_line: usize,
    chapters: Vec<TocEntry>,
}

pub fn toc(args: TocArgs, config: &ReaderConfig) -> anyhow::Result<()> {
    let raw_text = read_text(&args.file)?;
    let parts = split_document(&raw_text, &config.heading_rules(), config.split_policy());

    let listing = TocListing {
        source: args.file.to_string_lossy().to_string(),
        chunks: parts
            .into_iter()
            .map(|part| TocChunk {
                sequence_index: part.chunk.sequence_index,
                total_chunks: part.chunk.total_chunks,
                first_line: part.chunk.line_range.start,
                chapters: toc_entries(&part.segmented.chapters, config.toc_title_chars),
            })
            .collect(),
    };

    let yaml = serde_yaml::to_string(&listing).context("serialize toc yaml")?;
    write_stdout(yaml.as_bytes())
}

pub fn render(args: RenderArgs, config: &ReaderConfig) -> anyhow::Result<()> {
    let raw_text = read_text(&args.file)?;
    let segmented = segment(&raw_text, &config.heading_rules());
    tracing::info!(chapters = segmented.chapters.len(), "rendered text");

    match &args.out {
        Some(out) => std::fs::write(out, segmented.rendered_content.as_bytes())
            .with_context(|| format!("write rendered output: {}", out.display())),
        None => write_stdout(segmented.rendered_content.as_bytes()),
    }
}

pub async fn list(config: &ReaderConfig) -> anyhow::Result<()> {
    let store = LocalFsStore::open(&config.data_dir)
        .await
        .context("open store")?;

    let mut out = String::new();
    for group in store.list_groups().await.context("list groups")? {
        out.push_str(&format!("{}\t{}\n", group.id, group.display_name));
        for doc in store
            .list_documents_by_group(group.id)
            .await
            .context("list documents")?
        {
            out.push_str(&format!(
                "  {}\t{}\t{} chapters\t{} bytes\n",
                doc.id,
                doc.extracted_title,
                doc.chapters.len(),
                doc.size_bytes
            ));
        }
    }
    write_stdout(out.as_bytes())
}

#[derive(Debug, Serialize)]
struct OpenView {
    document_id: Uuid,
    title: String,
    #[serde(flatten)]
    position: InitialPosition,
    toc: Vec<TocEntry>,
    neighbors: Neighbors,
}

pub async fn open(args: OpenArgs, config: &ReaderConfig) -> anyhow::Result<()> {
    let store = LocalFsStore::open(&config.data_dir)
        .await
        .context("open store")?;
    let opened = open_document(&store, args.id).await?;
    let links = neighbors(&store, &opened.document).await?;

    print_json(&OpenView {
        document_id: opened.document.id,
        title: opened.document.extracted_title.clone(),
        toc: toc_entries(&opened.document.chapters, config.toc_title_chars),
        position: opened.position,
        neighbors: links,
    })
}

#[derive(Debug, Serialize)]
struct ProgressView {
    document_id: Uuid,
    saved: bool,
    chapter: Option<ChapterRef>,
    scroll: f64,
}

pub async fn progress(args: ProgressArgs, config: &ReaderConfig) -> anyhow::Result<()> {
    let store = LocalFsStore::open(&config.data_dir)
        .await
        .context("open store")?;
    let opened = open_document(&store, args.id).await?;

    let chapters = &opened.document.chapters;
    let chapter = match args.chapter {
        Some(ordinal) => chapters.iter().find(|c| c.ordinal == ordinal),
        None => chapters.first(),
    }
    .map(|c| c.to_ref());

    let record = capture_current_position(args.scroll, chapter.as_ref()).into_record(
        args.id,
        opened.history.as_ref(),
        args.elapsed,
        Utc::now(),
    );
    let saved = match store.upsert_history(&record).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(document_id = %args.id, ?err, "position capture failed");
            false
        }
    };

    print_json(&ProgressView {
        document_id: args.id,
        saved,
        chapter,
        scroll: record.last_scroll_position,
    })
}

#[derive(Debug, Serialize)]
struct ReadSummary {
    document_id: Uuid,
    updates: usize,
    scroll: f64,
    chapter: Option<ChapterRef>,
    saved: bool,
}

pub async fn read(args: ReadArgs, config: &ReaderConfig) -> anyhow::Result<()> {
    let store: Arc<dyn DocumentStore> = Arc::new(
        LocalFsStore::open(&config.data_dir)
            .await
            .context("open store")?,
    );
    let opened = open_document(store.as_ref(), args.id).await?;
    let session = ReadingSession::start(Arc::clone(&store), &opened, config.capture_interval);
    tracing::info!(
        document_id = %args.id,
        interval_secs = config.capture_interval.as_secs(),
        "reading session started"
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut updates = 0usize;
    while let Some(line) = lines.next_line().await.context("read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((scroll, ordinal)) = parse_view_update(line) else {
            tracing::warn!(line, "ignoring malformed position line");
            continue;
        };
        let chapter = match ordinal
            .and_then(|n| opened.document.chapters.iter().find(|c| c.ordinal == n))
        {
            Some(chapter) => Some(chapter.to_ref()),
            None => session.current().await.1,
        };
        session.update(scroll, chapter).await;
        updates += 1;
    }

    let (scroll, chapter) = session.current().await;
    let saved = session.close().await.context("final capture")?;
    print_json(&ReadSummary {
        document_id: args.id,
        updates,
        scroll,
        chapter,
        saved,
    })
}

/// `<scroll>` or `<scroll> <chapter ordinal>`.
fn parse_view_update(line: &str) -> Option<(f64, Option<usize>)> {
    let mut fields = line.split_whitespace();
    let scroll = fields.next()?.parse::<f64>().ok()?;
    let ordinal = match fields.next() {
        Some(field) => Some(field.parse::<usize>().ok()?),
        None => None,
    };
    if fields.next().is_some() {
        return None;
    }
    Some((scroll, ordinal))
}

pub async fn delete(args: DeleteArgs, config: &ReaderConfig) -> anyhow::Result<()> {
    let store = LocalFsStore::open(&config.data_dir)
        .await
        .context("open store")?;
    match (args.id, args.group) {
        (Some(id), _) => {
            store.delete_document(id).await.context("delete document")?;
            tracing::info!(document_id = %id, "deleted document");
        }
        (None, Some(group)) => {
            store.delete_group(group).await.context("delete group")?;
            tracing::info!(group_id = %group, "deleted group");
        }
        (None, None) => anyhow::bail!("either --id or --group is required"),
    }
    Ok(())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read text file: {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut json = serde_json::to_string_pretty(value).context("serialize json output")?;
    json.push('\n');
    write_stdout(json.as_bytes())
}

fn write_stdout(bytes: &[u8]) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes).context("write stdout")?;
    stdout.flush().context("flush stdout")
}
