mod cmd_edit;
mod cmd_nodes;
mod cmd_show;
mod cmd_validate;
mod session;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use textloom::v1::Editor;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "loom")]
#[command(about = "Inspect and edit textloom tree documents through their flat text")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new document with a single human root
    Init {
        /// Document file to create
        file: PathBuf,

        /// Initial text (default: empty document)
        #[arg(long)]
        text: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the flat text of the selected path
    Show {
        file: PathBuf,

        /// List the segments that make up the text
        #[arg(long)]
        segments: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the flat text with stdin and record what that means for the graph
    Edit {
        file: PathBuf,

        /// Selection anchor before the edit
        #[arg(long)]
        anchor: Option<usize>,

        /// Selection head before the edit (default: the anchor)
        #[arg(long, requires = "anchor")]
        head: Option<usize>,

        /// Caret position after the edit
        #[arg(long)]
        cursor: Option<usize>,

        /// Print a unified diff of the flat text
        #[arg(long)]
        diff: bool,
    },
    /// Select a node; the path runs from its root to it
    Select {
        file: PathBuf,

        #[arg(long)]
        node: String,
    },
    /// List every node in the document
    Nodes {
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Attach a new node under an existing one
    Add {
        file: PathBuf,

        /// Parent node (default: the selected node)
        #[arg(long)]
        parent: Option<String>,

        #[arg(long)]
        text: String,

        /// Mark the node as generated
        #[arg(long)]
        ai: bool,
    },
    /// Delete a node and everything only reachable through it
    Delete {
        file: PathBuf,

        #[arg(long)]
        node: String,
    },
    /// Split a node in two at a code-point offset
    Split {
        file: PathBuf,

        #[arg(long)]
        node: String,

        #[arg(long)]
        offset: usize,
    },
    /// Fold a node into its only parent
    Merge {
        file: PathBuf,

        #[arg(long)]
        node: String,
    },
    /// Check that a document loads without repairs
    Validate { file: PathBuf },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("LOOM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { file, text, force } => run_init(file, text, force),
        Commands::Show {
            file,
            segments,
            json,
        } => cmd_show::run(&file, segments, json),
        Commands::Edit {
            file,
            anchor,
            head,
            cursor,
            diff,
        } => cmd_edit::run(&file, cmd_edit::context(anchor, head, cursor), diff),
        Commands::Select { file, node } => {
            modify(&file, |editor| Ok(editor.select(&node)?))?;
            println!("{node}");
            Ok(())
        }
        Commands::Nodes { file, json } => cmd_nodes::run(&file, json),
        Commands::Add {
            file,
            parent,
            text,
            ai,
        } => cmd_nodes::add(&file, parent, &text, ai),
        Commands::Delete { file, node } => cmd_nodes::delete(&file, &node),
        Commands::Split { file, node, offset } => cmd_nodes::split(&file, &node, offset),
        Commands::Merge { file, node } => cmd_nodes::merge(&file, &node),
        Commands::Validate { file } => cmd_validate::run(&file),
    }
}

fn run_init(file: PathBuf, text: Option<String>, force: bool) -> Result<()> {
    if file.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", file.display());
    }
    let mut editor = Editor::default();
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        editor
            .apply_text(&text, &Default::default())
            .context("failed to seed document")?;
    }
    session::save(&file, &editor)?;
    eprintln!("Created {}", file.display());
    Ok(())
}

/// Load `file`, run `f` against it and save the result.
pub(crate) fn modify<T>(
    file: &std::path::Path,
    f: impl FnOnce(&mut Editor) -> Result<T>,
) -> Result<T> {
    let mut editor = session::load(file)?;
    let out = f(&mut editor)?;
    session::save(file, &editor)?;
    Ok(out)
}
