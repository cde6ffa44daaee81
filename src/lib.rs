use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

pub mod args;
pub mod backlinks;
pub mod edit;
pub mod formatting;
pub mod links;
pub mod markup;
pub mod note;
pub mod page;
pub mod paths;
pub mod render;

use args::{CommonFlags, take_dir_flag};
use backlinks::BacklinkIndex;
use formatting::{FormatContext, render_table, terminal_columns};
use links::LinkResolver;
use note::{Note, find_note, scan_notes};
use page::{DEFAULT_TEMPLATE, PageRequest, Status, build_fragments, sort_notes};
use render::{TITLE_CAP, render_note, truncate_label};

pub const DIR_ENV: &str = "ORG_NOTES_DIR";
const DEFAULT_DIR: &str = "notes";

pub fn entry() -> Result<(), Box<dyn Error>> {
    let (dir_flag, mut args) = take_dir_flag(env::args().skip(1).collect())?;
    if args.is_empty() {
        print_help();
        return Ok(());
    }

    let cmd = args.remove(0);
    let dir = notes_dir(dir_flag);

    match cmd.as_str() {
        "list" | "ls" => list_notes(args, &dir)?,
        "view" => view_note(args, &dir)?,
        "backlinks" => show_backlinks(args, &dir)?,
        "page" => show_page(args, &dir)?,
        "edit" => edit_note(args, &dir)?,
        "path" => println!("{}", dir.display()),
        "help" | "--help" | "-h" => print_help(),
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
        }
    }

    Ok(())
}

fn print_help() {
    println!(
        "\
Org Notes
Usage:
  orgn list [--sort <mode>] [--asc|--desc] [-s|--search <text>] [--plain]
                                  List notes with backlink counts (sort by path|title|backlinks|created)
  orgn view <path>                Print the rendered HTML of a note
  orgn backlinks <path>           List the notes that link to a note
  orgn page [<path>] [--edit] [--sort <mode>] [--asc|--desc] [--template <file>] [--status <code>]
                                  Print the full page for a note (status: saved|missing|outside|write)
  orgn edit <path> [--from <file>]
                                  Replace a note's text with stdin (or the given file)
  orgn path                       Show the notes directory
  orgn help                       Show this message

Global flags:
  -d, --dir <path>                Notes directory (overrides {DIR_ENV})

Environment:
  {DIR_ENV}                   Notes directory (default: ./{DEFAULT_DIR})
  NO_COLOR                        Disable colors in list output
  RUST_LOG                        Log filter, e.g. RUST_LOG=org_notes=debug
"
    );
}

/// Notes root: `--dir`, then the environment, then `./notes`.
pub fn notes_dir(flag: Option<PathBuf>) -> PathBuf {
    let dir = flag
        .or_else(|| env::var_os(DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR));
    fs::canonicalize(&dir).unwrap_or(dir)
}

fn load_notes(dir: &Path) -> Result<Vec<Note>, Box<dyn Error>> {
    scan_notes(dir).map_err(|e| {
        format!("Cannot read notes directory {}: {e}", dir.display()).into()
    })
}

fn require_key(flags: &CommonFlags, usage: &str) -> Result<String, Box<dyn Error>> {
    flags
        .positional
        .first()
        .cloned()
        .ok_or_else(|| usage.into())
}

fn lookup<'a>(notes: &'a [Note], key: &str) -> Result<&'a Note, Box<dyn Error>> {
    find_note(notes, key).ok_or_else(|| format!("Note {key} not found").into())
}

fn list_notes(args: Vec<String>, dir: &Path) -> Result<(), Box<dyn Error>> {
    let flags = CommonFlags::parse(args, "list")?;
    let notes = load_notes(dir)?;
    let resolver = LinkResolver::new(dir, &notes);
    let index = BacklinkIndex::build(&notes, &resolver);

    let needle = flags.search.as_deref().map(str::to_lowercase);
    let mut shown: Vec<&Note> = notes
        .iter()
        .filter(|n| match &needle {
            Some(q) => {
                n.title.to_lowercase().contains(q)
                    || n.relative_path.to_lowercase().contains(q)
            }
            None => true,
        })
        .collect();

    if shown.is_empty() {
        if needle.is_some() {
            println!("No notes match that search.");
        } else {
            println!("No .org files found in {}.", dir.display());
        }
        return Ok(());
    }

    let ascending = flags.ascending.unwrap_or(flags.sort.default_ascending());
    sort_notes(&mut shown, flags.sort, &index, ascending);

    let ctx = FormatContext::from_env(flags.plain);
    let query = flags.search.as_deref();
    let path_cap = terminal_columns()
        .unwrap_or(100)
        .saturating_sub(TITLE_CAP + 30)
        .max(16);
    let headers: Vec<String> = ["Title", "Path", "Links", "Created"]
        .iter()
        .map(|h| ctx.format_header(h))
        .collect();
    let rows: Vec<Vec<String>> = shown
        .iter()
        .map(|n| {
            vec![
                ctx.highlight_match(&truncate_label(&n.title, TITLE_CAP), query),
                ctx.format_path(&truncate_label(&n.relative_path, path_cap)),
                ctx.format_count(index.count(&n.relative_path)),
                ctx.format_created(n.created),
            ]
        })
        .collect();
    println!("{}", render_table(&headers, &rows));
    Ok(())
}

fn view_note(args: Vec<String>, dir: &Path) -> Result<(), Box<dyn Error>> {
    let flags = CommonFlags::parse(args, "view")?;
    let key = require_key(&flags, "Usage: orgn view <path>")?;
    let notes = load_notes(dir)?;
    let note = lookup(&notes, &key)?;
    let resolver = LinkResolver::new(dir, &notes);
    println!("{}", render_note(note, &resolver));
    Ok(())
}

fn show_backlinks(args: Vec<String>, dir: &Path) -> Result<(), Box<dyn Error>> {
    let flags = CommonFlags::parse(args, "backlinks")?;
    let key = require_key(&flags, "Usage: orgn backlinks <path>")?;
    let notes = load_notes(dir)?;
    let note = lookup(&notes, &key)?;
    let resolver = LinkResolver::new(dir, &notes);
    let index = BacklinkIndex::build(&notes, &resolver);

    let sources = index.backlinks_of(&notes, &note.relative_path);
    if sources.is_empty() {
        println!("No notes link to {}.", note.relative_path);
        return Ok(());
    }
    let ctx = FormatContext::from_env(flags.plain);
    for source in sources {
        println!("{}  | {}", source.title, ctx.format_path(&source.relative_path));
    }
    Ok(())
}

fn show_page(args: Vec<String>, dir: &Path) -> Result<(), Box<dyn Error>> {
    let flags = CommonFlags::parse(args, "page")?;
    let status = match flags.status.as_deref() {
        Some(code) => Some(
            Status::from_code(code)
                .ok_or_else(|| format!("Unknown status code: {code}"))?,
        ),
        None => None,
    };
    let template = match &flags.template {
        Some(path) => fs::read_to_string(path)?,
        None => DEFAULT_TEMPLATE.to_string(),
    };
    let notes = load_notes(dir)?;
    let request = PageRequest {
        selected: flags.positional.first().cloned(),
        edit_mode: flags.edit,
        sort: flags.sort,
        ascending: flags.ascending,
        status,
    };
    let fragments = build_fragments(dir, &notes, &request);
    println!("{}", fragments.fill(&template));
    Ok(())
}

fn edit_note(args: Vec<String>, dir: &Path) -> Result<(), Box<dyn Error>> {
    let flags = CommonFlags::parse(args, "edit")?;
    let key = require_key(&flags, "Usage: orgn edit <path> [--from <file>]")?;
    let content = match &flags.from {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let written = edit::apply_edit(dir, &key, &content)?;
    println!("Saved {}", written.display());
    Ok(())
}
