use album_tracker::collection::projection::{Filter, Projection};
use album_tracker::collection::{
    CollectionError, CollectionStore, Dispatcher, ImageRef, Intent, Outcome, SqliteKeyValueStore,
};
use album_tracker::collection::{catalog::DEFAULT_PAGE_SIZE, ItemId};
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the album database, looked up from the current directory upwards when omitted.
    #[clap(value_parser = parse_path)]
    pub path: Option<PathBuf>,

    /// Number of cards on each page.
    #[clap(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

#[derive(Parser)]
#[command(name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Shows the current page.
    View,

    /// Marks an item as owned, or not owned anymore.
    Toggle { id: ItemId },

    /// Adds a duplicate copy of an item.
    Dup { id: ItemId },

    /// Removes a duplicate copy of an item.
    Undup { id: ItemId },

    /// Reports that the stock image of an item can't be loaded.
    ImageFailed { id: ItemId },

    /// Attaches a photo to an item whose stock image is missing.
    Photo {
        id: ItemId,
        #[clap(value_parser = parse_path)]
        file: PathBuf,
    },

    /// Changes the filter and goes back to the first page.
    Filter { filter: Filter },

    /// Goes to the previous page.
    Prev,

    /// Goes to the next page.
    Next,

    /// Shows the current page number.
    Page,

    /// Writes the collection to a file, album-468.json by default.
    Export {
        #[clap(value_parser = parse_path)]
        file: Option<PathBuf>,
    },

    /// Replaces the whole collection with the content of a file.
    Import {
        #[clap(value_parser = parse_path)]
        file: PathBuf,
    },

    /// Shows the owned, missing and duplicate counters.
    Stats,

    /// Shows the path of the current album db.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

fn describe_image(image: &ImageRef) -> String {
    match image {
        ImageRef::Custom(_) => "custom photo".to_string(),
        other => other.src(),
    }
}

fn print_projection(projection: &Projection) {
    println!(
        "Filter: {} - Page {} / {}",
        projection.filter, projection.page, projection.total_pages
    );
    for card in projection.cards.iter() {
        let badge = if card.duplicates > 0 {
            format!(" x{}", card.duplicates)
        } else {
            String::new()
        };
        let upload = if card.photo_upload_allowed {
            " (photo upload available)"
        } else {
            ""
        };
        println!(
            "  [{}] {:>3}{:<5} {}{}",
            if card.owned { "x" } else { " " },
            card.id,
            badge,
            describe_image(&card.image),
            upload
        );
    }
}

fn print_stats(projection: &Projection) {
    let counters = &projection.counters;
    println!("Owned: {}", counters.owned_count);
    println!("Missing: {}", counters.missing_count);
    println!("Duplicates: {}", counters.duplicate_count);
}

fn run_intent(dispatcher: &mut Dispatcher, intent: Intent) -> Result<Outcome, String> {
    dispatcher.dispatch(intent).map_err(|err| err.to_string())
}

fn execute_command(
    line: String,
    dispatcher: &mut Dispatcher,
    db_path: &str,
) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    let cli = match cli {
        Ok(cli) => cli,
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
            return CommandExecutionResult::Ok;
        }
    };

    println!("{} {}", PROMPT, &line);
    let intent = match cli.command {
        InnerCommand::View => {
            print_projection(&dispatcher.redraw());
            return CommandExecutionResult::Ok;
        }
        InnerCommand::Toggle { id } => Intent::PrimaryActivate { id },
        InnerCommand::Dup { id } => Intent::SecondaryActivate { id },
        InnerCommand::Undup { id } => Intent::Decrement { id },
        InnerCommand::ImageFailed { id } => Intent::ImageLoadFailed { id },
        InnerCommand::Filter { filter } => Intent::SetFilter { filter },
        InnerCommand::Prev => Intent::PrevPage,
        InnerCommand::Next => Intent::NextPage,
        InnerCommand::Photo { id, file } => {
            return match run_intent(dispatcher, Intent::ImageActivate { id }) {
                Ok(Outcome::PhotoRequested { id, .. }) => attach_photo(dispatcher, id, file),
                Ok(_) => CommandExecutionResult::Error(CollectionError::PhotoNotAllowed(id).to_string()),
                Err(err) => CommandExecutionResult::Error(err),
            };
        }
        InnerCommand::Export { file } => return export(dispatcher, file),
        InnerCommand::Import { file } => match std::fs::read_to_string(&file) {
            Ok(contents) => Intent::Import { contents },
            Err(err) => {
                return CommandExecutionResult::Error(format!(
                    "Could not read {}: {}",
                    file.display(),
                    err
                ))
            }
        },
        InnerCommand::Page => {
            let projection = dispatcher.redraw();
            println!("Page {} / {}", projection.page, projection.total_pages);
            return CommandExecutionResult::Ok;
        }
        InnerCommand::Stats => {
            print_stats(&dispatcher.redraw());
            return CommandExecutionResult::Ok;
        }
        InnerCommand::Where => {
            println!("{}", db_path);
            return CommandExecutionResult::Ok;
        }
        InnerCommand::Exit => return CommandExecutionResult::Exit,
    };

    match run_intent(dispatcher, intent) {
        Ok(outcome) => {
            print_projection(outcome.projection());
            CommandExecutionResult::Ok
        }
        Err(err) => CommandExecutionResult::Error(err),
    }
}

fn attach_photo(dispatcher: &mut Dispatcher, id: ItemId, file: PathBuf) -> CommandExecutionResult {
    let bytes = match std::fs::read(&file) {
        Ok(bytes) => bytes,
        Err(err) => {
            return CommandExecutionResult::Error(format!(
                "Could not read {}: {}",
                file.display(),
                err
            ))
        }
    };
    match dispatcher.attach_photo(id, &bytes) {
        Ok(projection) => {
            print_projection(&projection);
            CommandExecutionResult::Ok
        }
        Err(err) => CommandExecutionResult::Error(err.to_string()),
    }
}

fn export(dispatcher: &mut Dispatcher, file: Option<PathBuf>) -> CommandExecutionResult {
    let (file_name, contents) = match run_intent(dispatcher, Intent::Export) {
        Ok(Outcome::Download {
            file_name,
            contents,
            ..
        }) => (file_name, contents),
        Ok(_) => return CommandExecutionResult::Error("Nothing to export".to_string()),
        Err(err) => return CommandExecutionResult::Error(err),
    };
    let file = file.unwrap_or_else(|| PathBuf::from(file_name));
    match std::fs::write(&file, contents) {
        Ok(()) => {
            println!("Collection exported to {}", file.display());
            CommandExecutionResult::Ok
        }
        Err(err) => CommandExecutionResult::Error(format!(
            "Could not write {}: {}",
            file.display(),
            err
        )),
    }
}

#[derive(rustyline_derive::Hinter)]
struct AlbumHelper {
    commands_names: Vec<String>,
}

impl AlbumHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        AlbumHelper { commands_names }
    }
}

impl Completer for AlbumHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .cloned()
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for AlbumHelper {}
impl Validator for AlbumHelper {}
impl Helper for AlbumHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let db_path = match cli_args.path {
        Some(path) => path,
        None => SqliteKeyValueStore::infer_path().with_context(|| {
            "Could not infer the album DB file path, please specify it explicitly."
        })?,
    };
    let kv_store = Arc::new(SqliteKeyValueStore::new(&db_path)?);
    let mut dispatcher = Dispatcher::new(CollectionStore::load(kv_store), cli_args.page_size);

    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<AlbumHelper, FileHistory>::with_config(config)?;
    rl.set_helper(Some(AlbumHelper::new()));

    let db_path = db_path.display().to_string();
    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &mut dispatcher, &db_path) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        eprintln!("Error: {}", err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
