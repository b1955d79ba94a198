use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mlhub_core::files::{file_category, is_binary_file, is_text_file, PreviewPolicy};
use mlhub_core::human::human_bytes;
use mlhub_core::query::{query, RecordQuery, SortDirection, SortField};
use mlhub_core::search::find_nodes;
use mlhub_core::{build_tree, export, FlatEntry, HistoryRecord, TreeNode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mlhub", about = "MLOps hub artifact and monitoring tools")]
struct Args {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a flat artifact listing as a tree
    Tree {
        /// JSON array of `{path, is_dir, file_size}` entries, or an object with `files`
        entries: PathBuf,
        /// Directory prefix shared by the entries
        #[arg(short, long, default_value = "")]
        base: String,
        /// Write the nested tree as JSON
        #[arg(short, long)]
        json: Option<PathBuf>,
        /// Print full paths of nodes whose names fuzzy-match this text
        #[arg(short, long)]
        find: Option<String>,
    },
    /// Filter, search and sort a monitoring history
    History {
        /// JSON array of history records, or an object with `history`
        records: PathBuf,
        /// Saved query (JSON); flags below override its fields
        #[arg(short, long)]
        query_file: Option<PathBuf>,
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// Keyword search, e.g. "negative" or "errors"
        #[arg(long)]
        semantic: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// timestamp, requestId, status, responseTime or confidence
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        direction: Option<String>,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
        /// Output file; defaults to stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Tell whether the artifact viewer would load a file
    Preview {
        name: String,
        #[arg(long)]
        size: Option<u64>,
        /// Treat the file as binary regardless of its extension
        #[arg(long)]
        binary: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Jsonl,
    Csv,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_json(path: &Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(io::BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

/// Accepts a bare array or an object wrapping one under `key`.
///
/// Elements that do not decode are skipped with a warning.
fn load_list<T: DeserializeOwned>(path: &Path, key: &str) -> Result<Vec<T>> {
    let value = match read_json(path)? {
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    let items: Vec<Value> = serde_json::from_value(value)
        .with_context(|| format!("{}: expected a list of {}", path.display(), key))?;
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value(item) {
            Ok(v) => out.push(v),
            Err(e) => warn!(path = %path.display(), index = i, error = %e, "skipping malformed {key} entry"),
        }
    }
    Ok(out)
}

fn output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("creating {}", p.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

fn print_node(n: &TreeNode, depth: usize, w: &mut impl Write) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    if n.is_folder() {
        writeln!(w, "{indent}{}/", n.name)?;
    } else if n.is_binary {
        writeln!(w, "{indent}{}  ({}) [binary]", n.name, human_bytes(n.size))?;
    } else {
        writeln!(w, "{indent}{}  ({})", n.name, human_bytes(n.size))?;
    }
    for child in n.children() {
        print_node(child, depth + 1, w)?;
    }
    Ok(())
}

fn print_tree(nodes: &[TreeNode], w: &mut impl Write) -> io::Result<()> {
    for n in nodes {
        print_node(n, 0, w)?;
    }
    w.flush()
}

fn run_tree(entries: &Path, base: &str, json: Option<PathBuf>, find: Option<String>) -> Result<()> {
    let entries: Vec<FlatEntry> = load_list(entries, "files")?;
    let roots = build_tree(&entries, base);
    info!(roots = roots.len(), "tree built");

    if let Some(path) = json {
        let value = export::tree_to_json(&roots)?;
        std::fs::write(&path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let mut out = io::stdout().lock();
    match find {
        Some(needle) => {
            for node in find_nodes(&roots, &needle) {
                writeln!(out, "{}", node.full_path)?;
            }
        }
        None => print_tree(&roots, &mut out)?,
    }
    Ok(())
}

struct HistoryArgs {
    search: Option<String>,
    status: Option<String>,
    semantic: Option<String>,
    from: Option<String>,
    to: Option<String>,
    sort: Option<String>,
    direction: Option<String>,
}

fn build_query(base: Option<&Path>, a: HistoryArgs) -> Result<RecordQuery> {
    let mut q = match base {
        Some(path) => serde_json::from_value(read_json(path)?)
            .with_context(|| format!("decoding query {}", path.display()))?,
        None => RecordQuery::default(),
    };
    if let Some(s) = a.search {
        q.free_text = s;
    }
    if let Some(s) = a.status {
        q.status = s;
    }
    if let Some(s) = a.semantic {
        q.semantic = s;
    }
    if a.from.is_some() {
        q.date_from = a.from;
    }
    if a.to.is_some() {
        q.date_to = a.to;
    }
    if let Some(s) = a.sort {
        q.sort_field = SortField::parse(&s);
        if q.sort_field.is_none() {
            warn!(field = %s, "unknown sort field, keeping input order");
        }
    }
    if let Some(d) = a.direction {
        q.sort_direction = SortDirection::parse(&d).unwrap_or_else(|| {
            warn!(direction = %d, "unknown sort direction, using desc");
            SortDirection::Desc
        });
    }
    debug!(?q, "history query");
    Ok(q)
}

fn print_table(records: &[&HistoryRecord], w: &mut impl Write) -> io::Result<()> {
    writeln!(
        w,
        "{:<22} {:<12} {:<8} {:>8} {:>10}",
        "timestamp", "request", "status", "ms", "confidence"
    )?;
    for r in records {
        let ms = r.response_time.map(|t| t.to_string()).unwrap_or_else(|| "-".into());
        let conf = r
            .confidence()
            .map(|c| format!("{:.1}%", c * 100.0))
            .unwrap_or_else(|| "N/A".into());
        writeln!(
            w,
            "{:<22} {:<12} {:<8} {:>8} {:>10}",
            r.timestamp, r.request_id, r.status, ms, conf
        )?;
    }
    writeln!(w, "{} record(s)", records.len())?;
    w.flush()
}

fn run_history(
    records: &Path,
    query_file: Option<&Path>,
    a: HistoryArgs,
    format: Format,
    out: Option<&Path>,
) -> Result<()> {
    let records: Vec<HistoryRecord> = load_list(records, "history")?;
    let q = build_query(query_file, a)?;
    let hits = query(&records, &q);

    let mut w = output(out)?;
    match format {
        Format::Table => print_table(&hits, &mut w)?,
        Format::Jsonl => export::to_jsonl(hits.iter().copied(), &mut w)?,
        Format::Csv => export::to_csv(hits.iter().copied(), &mut w)?,
    }
    if let (Some(path), Format::Jsonl) = (out, format) {
        info!(
            path = %path.display(),
            suggested = %export::history_file_name(chrono::Local::now().date_naive()),
            "history exported"
        );
    }
    Ok(())
}

fn run_preview(name: &str, size: Option<u64>, binary: bool) -> Result<()> {
    let is_binary = binary || is_binary_file(name);
    let load = PreviewPolicy::default().should_load(name, is_binary, size);
    println!("name: {name}");
    println!("category: {:?}", file_category(name));
    println!("binary: {is_binary}");
    println!("text: {}", is_text_file(name, is_binary));
    println!("load: {load}");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Tree {
            entries,
            base,
            json,
            find,
        } => run_tree(&entries, &base, json, find),
        Command::History {
            records,
            query_file,
            search,
            status,
            semantic,
            from,
            to,
            sort,
            direction,
            format,
            out,
        } => run_history(
            &records,
            query_file.as_deref(),
            HistoryArgs {
                search,
                status,
                semantic,
                from,
                to,
                sort,
                direction,
            },
            format,
            out.as_deref(),
        ),
        Command::Preview { name, size, binary } => run_preview(&name, size, binary),
    }
}
