//! notetree CLI: browse and restructure a note/tag hierarchy.
//!
//! Usage:
//!   notetree tree [--all] [--json]
//!   notetree note <subcommand> [--db path]
//!   notetree promote <path>
//!
//! Nodes are addressed by path, e.g. `t1/n10/n11` or `all/n10`.

use clap::{Parser, Subcommand};
use notetree::{EntityId, NoteId, Placement, SqliteApi, TagId, ViewState, Workspace};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "notetree", version, about = "Multi-instance note and tag hierarchy")]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Path to the saved view state (expansion and selection)
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the hierarchy
    Tree {
        /// Show collapsed subtrees too
        #[arg(long)]
        all: bool,
        /// Print a JSON snapshot instead of an outline
        #[arg(long)]
        json: bool,
    },
    /// List every path at which an entity is shown
    Find {
        /// Entity, e.g. `note:10`, `n10`, `tag:1` or `t1`
        entity: String,
    },
    /// Expand a node and its ancestors
    Expand { path: String },
    /// Collapse a node
    Collapse { path: String },
    /// Select a node
    Select { path: String },
    /// Manage notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Move a node up to its grandparent's level
    Promote { path: String },
    /// Move a node under its previous sibling
    Demote { path: String },
    /// Attach the entity at one path to the entity at another
    Paste {
        /// Node to mark
        marked: String,
        /// Node to paste onto
        target: String,
    },
}

#[derive(Subcommand)]
enum NoteAction {
    /// Create a note
    Create {
        title: String,
        /// Body text
        #[arg(long, default_value = "")]
        content: String,
        /// Tag the new note
        #[arg(long, conflicts_with = "parent")]
        tag: Option<i64>,
        /// Make the new note a subpage
        #[arg(long)]
        parent: Option<i64>,
    },
    /// Rename a note
    Rename { id: i64, title: String },
    /// Replace a note's body
    Content { id: i64, content: String },
    /// Delete a note and its subpages
    Delete { id: i64 },
    /// Add a tag to a note
    Tag { id: i64, tag: i64 },
    /// Remove a tag from a note
    Untag { id: i64, tag: i64 },
    /// Make a note a subpage, or a root note without --parent
    Move {
        id: i64,
        #[arg(long)]
        parent: Option<i64>,
    },
}

#[derive(Subcommand)]
enum TagAction {
    /// Create a tag
    Create {
        name: String,
        #[arg(long)]
        parent: Option<i64>,
    },
    /// Rename a tag
    Rename { id: i64, name: String },
    /// Delete a tag and its descendant tags
    Delete { id: i64 },
    /// Nest a tag, or move it to the top level without --parent
    Move {
        id: i64,
        #[arg(long)]
        parent: Option<i64>,
    },
}

/// Get the default data directory (~/.local/share/notetree)
fn data_dir() -> PathBuf {
    let data_dir = dirs::data_dir().unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    let dir = data_dir.join("notetree");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn open_workspace(db: &Path, state: &Path) -> Result<Workspace, String> {
    let api = SqliteApi::open(db).map_err(|e| format!("Failed to open database: {}", e))?;
    let mut ws = Workspace::open(Arc::new(api)).map_err(|e| format!("Failed to load notes: {}", e))?;
    if let Some(view) = load_view_state(state)? {
        ws.apply_view_state(&view)
            .map_err(|e| format!("Failed to restore view state: {}", e))?;
    }
    Ok(ws)
}

fn load_view_state(path: &Path) -> Result<Option<ViewState>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    match serde_json::from_str(&raw) {
        Ok(state) => Ok(Some(state)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable view state");
            Ok(None)
        }
    }
}

fn save_view_state(ws: &Workspace, path: &Path) -> Result<(), String> {
    let json = serde_json::to_string_pretty(&ws.view_state()).map_err(|e| e.to_string())?;
    std::fs::write(path, json).map_err(|e| format!("cannot write '{}': {}", path.display(), e))
}

/// Report an operation result the way every command does
fn report<T>(result: Result<T, impl std::fmt::Display>, done: impl FnOnce(T) -> String) -> i32 {
    match result {
        Ok(value) => {
            println!("{}", done(value));
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn resolve(ws: &Workspace, path: &str) -> Result<notetree::NodeKey, String> {
    ws.tree().resolve_path(path).map_err(|e| e.to_string())
}

fn cmd_tree(ws: &Workspace, all: bool, json: bool) -> i32 {
    if json {
        return report(serde_json::to_string_pretty(&ws.tree().snapshot(ws.cache())), |s| s);
    }
    print!("{}", ws.tree().render_outline(ws.cache(), !all));
    0
}

fn cmd_find(ws: &Workspace, entity: &str) -> i32 {
    let entity: EntityId = match entity.parse() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let instances = ws.instances(entity);
    if instances.is_empty() {
        eprintln!("Error: {} is not shown anywhere", entity);
        return 1;
    }
    for key in instances {
        println!("{}", ws.tree().path_string(key));
    }
    0
}

fn cmd_expand(ws: &mut Workspace, path: &str, expanded: bool) -> i32 {
    let key = match resolve(ws, path) {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let result = if expanded {
        ws.tree_mut().expand_to(key)
    } else {
        ws.tree_mut().set_expanded(key, false)
    };
    report(result, |_| format!("{} {}", if expanded { "Expanded" } else { "Collapsed" }, path))
}

fn cmd_select(ws: &mut Workspace, path: &str) -> i32 {
    let key = match resolve(ws, path) {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    report(ws.tree_mut().select(Some(key)), |_| format!("Selected {}", path))
}

fn cmd_note(ws: &mut Workspace, action: NoteAction) -> i32 {
    match action {
        NoteAction::Create {
            title,
            content,
            tag,
            parent,
        } => {
            let placement = match (tag, parent) {
                (Some(tag), _) => Placement::UnderTag(TagId::new(tag)),
                (None, Some(parent)) => Placement::UnderNote(NoteId::new(parent)),
                (None, None) => Placement::Root,
            };
            report(ws.create_note(&title, &content, placement), |id| {
                format!("Created note '{}' ({})", title, id)
            })
        }
        NoteAction::Rename { id, title } => {
            report(ws.rename(NoteId::new(id).into(), &title), |_| format!("Renamed note {}", id))
        }
        NoteAction::Content { id, content } => report(ws.update_note_content(NoteId::new(id), &content), |_| {
            format!("Updated note {}", id)
        }),
        NoteAction::Delete { id } => report(ws.delete(NoteId::new(id).into()), |_| format!("Deleted note {}", id)),
        NoteAction::Tag { id, tag } => report(ws.attach_note_to_tag(NoteId::new(id), TagId::new(tag)), |_| {
            format!("Tagged note {} with {}", id, tag)
        }),
        NoteAction::Untag { id, tag } => report(ws.detach_note_from_tag(NoteId::new(id), TagId::new(tag)), |_| {
            format!("Removed tag {} from note {}", tag, id)
        }),
        NoteAction::Move { id, parent } => report(ws.move_note(NoteId::new(id), parent.map(NoteId::new)), |_| {
            format!("Moved note {}", id)
        }),
    }
}

fn cmd_tag(ws: &mut Workspace, action: TagAction) -> i32 {
    match action {
        TagAction::Create { name, parent } => report(ws.create_tag(&name, parent.map(TagId::new)), |id| {
            format!("Created tag '{}' ({})", name, id)
        }),
        TagAction::Rename { id, name } => {
            report(ws.rename(TagId::new(id).into(), &name), |_| format!("Renamed tag {}", id))
        }
        TagAction::Delete { id } => report(ws.delete(TagId::new(id).into()), |_| format!("Deleted tag {}", id)),
        TagAction::Move { id, parent } => report(ws.move_tag(TagId::new(id), parent.map(TagId::new)), |_| {
            format!("Moved tag {}", id)
        }),
    }
}

fn cmd_restructure(ws: &mut Workspace, path: &str, promote: bool) -> i32 {
    let key = match resolve(ws, path) {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let verb = if promote { "promote" } else { "demote" };
    let result = if promote { ws.promote(key) } else { ws.demote(key) };
    match result {
        Ok(true) => {
            println!("{}d {}", if promote { "Promote" } else { "Demote" }, path);
            0
        }
        Ok(false) => {
            eprintln!("Error: cannot {} {}", verb, path);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_paste(ws: &mut Workspace, marked: &str, target: &str) -> i32 {
    let (marked_key, target_key) = match (resolve(ws, marked), resolve(ws, target)) {
        (Ok(m), Ok(t)) => (m, t),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if let Err(e) = ws.mark(marked_key) {
        eprintln!("Error: {}", e);
        return 1;
    }
    report(ws.paste(target_key), |_| format!("Pasted {} onto {}", marked, target))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let db = cli.db.unwrap_or_else(|| data_dir().join("notetree.db"));
    let state = cli.state.unwrap_or_else(|| data_dir().join("view.json"));

    let mut ws = match open_workspace(&db, &state) {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Tree { all, json } => cmd_tree(&ws, all, json),
        Commands::Find { entity } => cmd_find(&ws, &entity),
        Commands::Expand { path } => cmd_expand(&mut ws, &path, true),
        Commands::Collapse { path } => cmd_expand(&mut ws, &path, false),
        Commands::Select { path } => cmd_select(&mut ws, &path),
        Commands::Note { action } => cmd_note(&mut ws, action),
        Commands::Tag { action } => cmd_tag(&mut ws, action),
        Commands::Promote { path } => cmd_restructure(&mut ws, &path, true),
        Commands::Demote { path } => cmd_restructure(&mut ws, &path, false),
        Commands::Paste { marked, target } => cmd_paste(&mut ws, &marked, &target),
    };

    if let Err(e) = save_view_state(&ws, &state) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    std::process::exit(code);
}
