//! pagefold CLI - page-arrangement workspace tool

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pagefold::{
    load_store, load_workspace, render, Event, JsonFormat, StreamClient, StreamEvent, Workspace,
    WorkspaceOptions,
};

#[derive(Parser)]
#[command(name = "pagefold")]
#[command(version)]
#[command(about = "Inspect, replay and watch page-arrangement workspaces", long_about = None)]
struct Cli {
    /// Do not insert merge affordances between adjacent documents
    #[arg(long, global = true)]
    no_merge: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize a document store and print the resulting snapshot
    Materialize {
        /// Filename-keyed JSON document store
        #[arg(value_name = "STORE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Print the workspace markup instead of the snapshot
        #[arg(long)]
        markup: bool,
    },

    /// Print the snapshot of a saved workspace
    Snapshot {
        /// Saved workspace markup
        #[arg(value_name = "WORKSPACE")]
        input: PathBuf,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Print a text outline of a workspace or a document store
    Outline {
        /// Workspace markup, or a `.json` document store
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Replay a recorded event stream into an empty workspace
    Replay {
        /// Recorded `text/event-stream` body
        #[arg(value_name = "EVENTS")]
        input: PathBuf,
    },

    /// Follow the live update stream
    Watch {
        /// Event endpoint (defaults to http://SERVER_HOST_IP:SERVER_PORT/events)
        #[arg(long)]
        url: Option<String>,

        /// Server host
        #[arg(long, env = "SERVER_HOST_IP", default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(long, env = "SERVER_PORT", default_value_t = 8080)]
        port: u16,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let options = WorkspaceOptions::new().with_merge_affordances(!cli.no_merge);

    let result = match cli.command {
        Some(Commands::Materialize {
            input,
            output,
            compact,
            markup,
        }) => cmd_materialize(&input, output.as_deref(), compact, markup, options),
        Some(Commands::Snapshot { input, compact }) => cmd_snapshot(&input, compact, options),
        Some(Commands::Outline { input }) => cmd_outline(&input, options),
        Some(Commands::Replay { input }) => cmd_replay(&input, options),
        Some(Commands::Watch { url, host, port }) => {
            let url = url.unwrap_or_else(|| format!("http://{}:{}/events", host, port));
            cmd_watch(&url, options)
        }
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: pagefold <COMMAND>".yellow());
            println!("       pagefold --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn is_store(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn workspace_from_store(
    path: &Path,
    options: WorkspaceOptions,
) -> Result<Workspace, Box<dyn std::error::Error>> {
    let store = load_store(path)?;
    let mut workspace = Workspace::with_options(options);
    workspace.materialize(&store)?;
    workspace.run_until_idle()?;
    Ok(workspace)
}

fn cmd_materialize(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    markup: bool,
    options: WorkspaceOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = workspace_from_store(input, options)?;

    let text = if markup {
        workspace.to_markup()
    } else {
        render::to_json(&workspace.extract(), json_format(compact))?
    };

    if let Some(path) = output {
        fs::write(path, &text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", text);
    }

    Ok(())
}

fn cmd_snapshot(
    input: &Path,
    compact: bool,
    options: WorkspaceOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = load_workspace(input, options)?;
    let json = render::to_json(&workspace.extract(), json_format(compact))?;
    println!("{}", json);
    Ok(())
}

fn cmd_outline(input: &Path, options: WorkspaceOptions) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = if is_store(input) {
        workspace_from_store(input, options)?
    } else {
        load_workspace(input, options)?
    };
    print_outline(&workspace);
    Ok(())
}

fn cmd_replay(input: &Path, options: WorkspaceOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut workspace = Workspace::with_options(options);
    let mut client = StreamClient::new();
    client.pump(BufReader::new(File::open(input)?), &workspace.sender());
    workspace.run()?;

    println!(
        "{} {} events replayed",
        "Done!".green().bold(),
        client.delivered()
    );
    print_outline(&workspace);
    Ok(())
}

fn cmd_watch(url: &str, options: WorkspaceOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut workspace = Workspace::with_options(options);
    let sender = workspace.sender();
    let target = url.to_string();

    let reader = thread::spawn(move || match reqwest::blocking::get(&target) {
        Ok(response) => {
            let mut client = StreamClient::new();
            client.pump(BufReader::new(response), &sender);
        }
        Err(e) => {
            log::warn!("could not connect to {}: {}", target, e);
            let _ = sender.send(Event::Stream(StreamEvent::Failed(e.to_string())));
        }
    });

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Listening on {}", url));

    let mut shown = String::new();
    while !workspace.stream_finished() {
        pb.tick();
        if let Some(event) = workspace.next_event(Duration::from_millis(100)) {
            workspace.dispatch(event)?;
            workspace.run_until_idle()?;

            let outline = render::to_outline(&workspace.extract());
            if outline != shown {
                pb.suspend(|| {
                    println!("{}", "Workspace changed".cyan().bold());
                    print!("{}", outline);
                });
                shown = outline;
            }
        }
    }
    workspace.run_until_idle()?;
    pb.finish_and_clear();

    if reader.join().is_err() {
        log::warn!("update stream reader panicked");
    }
    print_notices(&workspace);
    Ok(())
}

fn print_outline(workspace: &Workspace) {
    let arrangement = workspace.extract();
    println!("{}", "Workspace".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    print!("{}", render::to_outline(&arrangement));
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "{}: {}  {}: {}",
        "Documents".bold(),
        arrangement.document_count(),
        "Pages".bold(),
        arrangement.page_count()
    );
    print_notices(workspace);
}

fn print_notices(workspace: &Workspace) {
    let tree = workspace.tree();
    for notice in workspace.notices() {
        let message = tree.attr(notice, pagefold::schema::MESSAGE).unwrap_or_default();
        let detail = tree.attr(notice, pagefold::schema::DETAIL).unwrap_or_default();
        println!("{} {} {}", "!".yellow().bold(), message, detail.dimmed());
    }
}

fn cmd_version() {
    println!("{} {}", "pagefold".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Page-arrangement workspace tool");
    println!();
    println!("License: MIT");
}
