use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use duelist::models::parse_due_date;
use duelist::render::{format_due_date, render_rows, render_table};
use duelist::{
    Backend, Config, FilterMode, SortMode, TaskFields, TaskId, TaskStore, Tracker, TrackerError, open_store,
};
use eyre::Result;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duelist")]
#[command(about = "Duelist - track assignments by due date")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the store directory (default: from config, else the platform data directory)
    #[arg(short, long, global = true)]
    store_path: Option<PathBuf>,

    /// Storage backend: jsonl or sqlite
    #[arg(short, long, global = true)]
    backend: Option<Backend>,

    /// Config file (default: $DUELIST_CONFIG or the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Date to treat as today, YYYY-MM-DD
    #[arg(long, global = true, value_parser = parse_due_date)]
    today: Option<NaiveDate>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an assignment
    Add {
        assignment: String,

        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: String,

        /// Class or course
        #[arg(long = "class")]
        subject: Option<String>,

        /// Assignment type (essay, quiz, ...)
        #[arg(long = "type")]
        kind: Option<String>,
    },

    /// List assignments
    List {
        /// all, overdue, today or upcoming
        #[arg(long)]
        filter: Option<FilterMode>,

        /// none, asc or desc (by due date)
        #[arg(long)]
        sort: Option<SortMode>,

        /// Ignore configured defaults and show everything unsorted
        #[arg(long, conflicts_with_all = ["filter", "sort"])]
        clear: bool,
    },

    /// Toggle done for a task (row number or id prefix)
    Done { task: String },

    /// Delete a task
    Delete {
        task: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Edit a task in place
    Edit {
        task: String,

        #[arg(long)]
        assignment: Option<String>,

        #[arg(long)]
        due: Option<String>,

        #[arg(long = "class")]
        subject: Option<String>,

        #[arg(long = "type")]
        kind: Option<String>,
    },

    /// Print a task's fields
    Show { task: String },
}

fn main() {
    setup_logging();

    if let Err(e) = run(Cli::parse()) {
        match e.downcast_ref::<TrackerError>() {
            Some(TrackerError::Validation(msg)) => eprintln!("{}", msg),
            _ => eprintln!("Error: {:#}", e),
        }
        process::exit(1);
    }
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let color = config.color && !cli.no_color;
    let store_dir = cli.store_path.clone().unwrap_or_else(|| config.store_dir());
    let backend = cli.backend.unwrap_or(config.backend);
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());

    let mut tracker = Tracker::open(open_store(backend, &store_dir)?)?;

    match cli.command {
        Commands::Add {
            assignment,
            due,
            subject,
            kind,
        } => {
            let fields = TaskFields::new(assignment, due)
                .with_subject(subject.unwrap_or_default())
                .with_kind(kind.unwrap_or_default());
            let task = tracker.add_task(&fields)?;
            println!(
                "Added {} ({}), due {}",
                task.assignment,
                task.id.short(),
                format_due_date(task.due_date)
            );
        }
        Commands::List { filter, sort, clear } => {
            if clear {
                tracker.clear_filters();
            } else {
                tracker.set_filter(filter.unwrap_or(config.default_filter));
                tracker.set_sort(sort.unwrap_or(config.default_sort));
            }
            let rows = render_rows(&tracker.display(today), today);
            print!("{}", render_table(&rows, color));
        }
        Commands::Done { task } => {
            let id = tracker.resolve(&task)?;
            let done = tracker.toggle_done(id)?;
            let name = tracker.get(id).map(|t| t.assignment.as_str()).unwrap_or_default();
            if done {
                println!("Marked {} done", name);
            } else {
                println!("Marked {} not done", name);
            }
        }
        Commands::Delete { task, yes } => {
            let id = tracker.resolve(&task)?;
            let name = tracker.get(id).map(|t| t.assignment.clone()).unwrap_or_default();
            if !yes && !confirm(&format!("Delete {}?", name))? {
                println!("Cancelled");
                return Ok(());
            }
            tracker.delete_task(id)?;
            println!("Deleted {}", name);
        }
        Commands::Edit {
            task,
            assignment,
            due,
            subject,
            kind,
        } => {
            let id = tracker.resolve(&task)?;
            let mut fields = tracker.start_edit(id)?;
            if let Some(assignment) = assignment {
                fields.assignment = assignment;
            }
            if let Some(due) = due {
                fields.due_date = due;
            }
            if let Some(subject) = subject {
                fields.subject = subject;
            }
            if let Some(kind) = kind {
                fields.kind = kind;
            }
            let task = tracker.update_task(id, &fields)?;
            println!("Updated {} ({})", task.assignment, task.id.short());
        }
        Commands::Show { task } => {
            let id = tracker.resolve(&task)?;
            print_fields(&tracker, id)?;
        }
    }

    Ok(())
}

fn print_fields<S: TaskStore>(tracker: &Tracker<S>, id: TaskId) -> Result<()> {
    let fields = tracker.start_edit(id)?;
    println!("id:         {}", id);
    println!("assignment: {}", fields.assignment);
    println!("due:        {}", fields.due_date);
    println!("class:      {}", fields.subject);
    println!("type:       {}", fields.kind);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
