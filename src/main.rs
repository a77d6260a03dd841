use anyhow::{bail, Context, Result};
use queryplay::config::Config;
use queryplay::export::{DataExporter, ExportFormat};
use queryplay::projection::GenericTable;
use queryplay::session::{LoadOutcome, Session};
use queryplay::utils::logging::{init_tracing, LogRingBuffer};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

mod table_display;

use table_display::{display_results, display_schema};

fn print_help() {
    println!("queryplay - query delimited text files with SQL");
    println!();
    println!("Usage:");
    println!("  queryplay [OPTIONS] [FILE.csv ...]");
    println!();
    println!("Options:");
    println!("  --query <SQL>       - Run one statement and exit");
    println!("  --config <PATH>     - Read settings from PATH instead of the default location");
    println!("  --generate-config   - Write a commented default config file");
    println!("  --help              - Show this help");
    println!();
    print_commands();
}

fn print_commands() {
    println!("Commands:");
    println!("  \\tables                  - List loaded tables");
    println!("  \\schema                  - Show columns and types of every table");
    println!("  \\load <file>             - Load another file");
    println!("  \\export <csv|json> [path] - Export the last result");
    println!("  \\reset                   - Drop every loaded table");
    println!("  \\log                     - Show recent log lines");
    println!("  \\help                    - Show this help");
    println!("  \\quit                    - Exit");
    println!();
    println!("Statements end with ';'. Only read-only queries are accepted.");
}

struct CliArgs {
    files: Vec<String>,
    query: Option<String>,
    config_path: Option<PathBuf>,
    help: bool,
    generate_config: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut parsed = CliArgs {
        files: Vec::new(),
        query: None,
        config_path: None,
        help: false,
        generate_config: false,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => parsed.help = true,
            "--generate-config" => parsed.generate_config = true,
            "--query" | "-q" => {
                let sql = iter.next().context("--query needs a statement")?;
                parsed.query = Some(sql.clone());
            }
            "--config" => {
                let path = iter.next().context("--config needs a path")?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            other if other.starts_with("--") => bail!("Unknown option: {}", other),
            file => parsed.files.push(file.to_string()),
        }
    }

    Ok(parsed)
}

fn generate_config() -> Result<()> {
    let path = Config::get_config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Error creating config directory {}", parent.display()))?;
    }
    std::fs::write(&path, Config::create_default_with_comments())
        .with_context(|| format!("Error writing config file {}", path.display()))?;
    println!("Configuration file created at: {}", path.display());
    Ok(())
}

fn load_file(session: &mut Session, path: &str) {
    match session.load_path(path) {
        Ok(LoadOutcome::Loaded { report, .. }) => {
            println!("{}", report.summary());
            for anomaly in report.anomalies.iter().take(5) {
                println!("  {}", anomaly);
            }
        }
        Ok(LoadOutcome::AlreadyLoaded { source_name }) => {
            println!("'{}' is already loaded", source_name);
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}

/// Runs statements and backslash commands against one session
struct Repl {
    session: Session,
    logs: LogRingBuffer,
    max_display_rows: usize,
    last_result: Option<GenericTable>,
}

enum Flow {
    Continue,
    Quit,
}

impl Repl {
    fn run_statement(&mut self, sql: &str) -> bool {
        match self.session.query(sql) {
            Ok(table) => {
                display_results(&table, self.max_display_rows);
                self.last_result = Some(table);
                true
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                false
            }
        }
    }

    fn run_command(&mut self, line: &str) -> Flow {
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match command {
            "\\q" | "\\quit" | "\\exit" => return Flow::Quit,
            "\\help" | "\\?" => print_commands(),
            "\\tables" => {
                let schemas = self.session.schema();
                if schemas.is_empty() {
                    println!("No tables loaded.");
                }
                for schema in schemas {
                    println!(
                        "{} ({} rows, {} columns)",
                        schema.name,
                        schema.row_count,
                        schema.columns.len()
                    );
                }
            }
            "\\schema" => display_schema(&self.session.schema()),
            "\\load" => match args.first() {
                Some(path) => load_file(&mut self.session, path),
                None => eprintln!("Usage: \\load <file>"),
            },
            "\\export" => self.export(&args),
            "\\reset" => {
                self.session.reset();
                self.last_result = None;
                println!("All tables dropped.");
            }
            "\\log" => {
                for entry in self.logs.get_recent(50) {
                    println!("{}", entry.format_for_display());
                }
            }
            other => eprintln!("Unknown command {}. Try \\help", other),
        }
        Flow::Continue
    }

    fn export(&self, args: &[&str]) {
        let Some(table) = &self.last_result else {
            eprintln!("Nothing to export yet; run a query first");
            return;
        };
        let format = match args.first().map(|f| f.parse::<ExportFormat>()) {
            Some(Ok(format)) => format,
            Some(Err(e)) => {
                eprintln!("Error: {}", e);
                return;
            }
            None => {
                eprintln!("Usage: \\export <csv|json> [path]");
                return;
            }
        };
        let path = args
            .get(1)
            .map(|p| p.to_string())
            .unwrap_or_else(|| DataExporter::default_filename(format));

        match DataExporter::export_to_path(table, format, Path::new(&path)) {
            Ok(message) => println!("{}", message),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    fn run(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        if interactive {
            println!("Type \\help for commands. Try: {}", self.session.suggested_query());
        }

        let mut pending = String::new();
        let mut lines = stdin.lock().lines();
        loop {
            if interactive {
                print!("{}", if pending.is_empty() { "sql> " } else { "...> " });
                io::stdout().flush()?;
            }
            let Some(line) = lines.next() else { break };
            let line = line?;
            let trimmed = line.trim();

            if pending.is_empty() && trimmed.starts_with('\\') {
                if let Flow::Quit = self.run_command(trimmed) {
                    break;
                }
                continue;
            }
            if trimmed.is_empty() {
                continue;
            }

            pending.push_str(&line);
            pending.push('\n');
            if trimmed.ends_with(';') {
                let statement = std::mem::take(&mut pending);
                self.run_statement(&statement);
            }
        }

        if !pending.trim().is_empty() {
            self.run_statement(&pending);
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    if cli.help {
        print_help();
        return Ok(());
    }
    if cli.generate_config {
        return generate_config();
    }

    let config = match &cli.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };
    let logs = init_tracing(&config.logging.filter);

    let mut session = Session::new(&config).context("Invalid configuration")?;
    for file in &cli.files {
        load_file(&mut session, file);
    }

    let mut repl = Repl {
        session,
        logs,
        max_display_rows: config.display.max_display_rows,
        last_result: None,
    };

    match cli.query {
        Some(sql) => {
            if !repl.run_statement(&sql) {
                std::process::exit(1);
            }
            Ok(())
        }
        None => repl.run(),
    }
}
