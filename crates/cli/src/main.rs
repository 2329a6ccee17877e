// Sabana CLI - call-detail record triage from the terminal

mod exit_codes;
mod util;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use sabana_engine::{
    has_coordinates, LoadedTable, MapScope, MatchCriterion, Profile, SabanaError, SearchTarget,
    Session, Slot, Table, ViewMode, ViewOutcome, ViewSpec, ViewStatus,
};

use exit_codes::{
    engine_exit_code, EXIT_ERROR, EXIT_NO_COORDINATES, EXIT_PROFILE, EXIT_SUCCESS,
    EXIT_UNREADABLE, EXIT_WRITE,
};

#[derive(Parser)]
#[command(name = "sabana")]
#[command(about = "Triage call-detail record spreadsheets (sábanas telefónicas)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Analysis profile (TOML): aliases, overnight window, ranking sizes, map tiles
    #[arg(long, global = true, env = "SABANA_PROFILE", value_name = "PATH")]
    profile: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one view to a call-detail file
    #[command(after_help = "\
Examples:
  sabana view sabana.xlsx
  sabana view sabana.xlsx --mode overnight --out pernocta.xlsx
  sabana view sabana.csv --mode towers --map antenas.html
  sabana view sabana.csv --mode search --query 310555 --target either --json")]
    View {
        /// Call-detail file (xlsx, xls, xlsb, ods, csv, tsv, txt)
        file: PathBuf,

        /// View to apply
        #[arg(long, short = 'm', value_enum, default_value_t = ModeArg::Overview)]
        mode: ModeArg,

        /// Number (or part of one) to look for; used by --mode search
        #[arg(long, short = 'q', default_value = "")]
        query: String,

        /// Line column(s) the search looks at
        #[arg(long, value_enum, default_value_t = TargetArg::B)]
        target: TargetArg,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Keep the rows of FILE whose number or location also appears in OTHER
    #[command(after_help = "\
Examples:
  sabana cross sospechoso.xlsx victima.xlsx
  sabana cross sospechoso.xlsx victima.xlsx --by location --map cruce.html")]
    Cross {
        /// Primary call-detail file; result rows come from here
        file: PathBuf,

        /// Second call-detail file, used only for matching
        other: PathBuf,

        /// What two rows must share to match
        #[arg(long, value_enum, default_value_t = ByArg::Number)]
        by: ByArg,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show how the file's columns map onto the canonical schema
    Columns {
        /// Call-detail file
        file: PathBuf,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Export the result table (xlsx, csv or json, by extension)
    #[arg(long, short = 'o', value_name = "PATH")]
    out: Option<PathBuf>,

    /// Write an interactive HTML map of the result
    #[arg(long, value_name = "PATH")]
    map: Option<PathBuf>,

    /// Rows drawn on the map
    #[arg(long, value_enum, default_value_t = ScopeArg::View)]
    map_scope: ScopeArg,

    /// Print the result as JSON instead of a text table
    #[arg(long)]
    json: bool,

    /// Rows shown in the text table
    #[arg(long, default_value_t = 50)]
    rows: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Overview,
    Overnight,
    Towers,
    Contacts,
    Search,
}

impl From<ModeArg> for ViewMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Overview => ViewMode::Overview,
            ModeArg::Overnight => ViewMode::Overnight,
            ModeArg::Towers => ViewMode::Towers,
            ModeArg::Contacts => ViewMode::Contacts,
            ModeArg::Search => ViewMode::Search,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TargetArg {
    /// linea_b (called number)
    B,
    /// linea_a (calling number)
    A,
    /// either line column
    Either,
}

impl From<TargetArg> for SearchTarget {
    fn from(t: TargetArg) -> Self {
        match t {
            TargetArg::B => SearchTarget::LineaB,
            TargetArg::A => SearchTarget::LineaA,
            TargetArg::Either => SearchTarget::Either,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ByArg {
    Number,
    Location,
}

impl From<ByArg> for MatchCriterion {
    fn from(b: ByArg) -> Self {
        match b {
            ByArg::Number => MatchCriterion::Identifier,
            ByArg::Location => MatchCriterion::Location,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    /// rows of the current result
    View,
    /// every row of the primary file
    Full,
}

impl From<ScopeArg> for MapScope {
    fn from(s: ScopeArg) -> Self {
        match s {
            ScopeArg::View => MapScope::CurrentView,
            ScopeArg::Full => MapScope::Full,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  sabana-engine ", env!("CARGO_PKG_VERSION"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load_profile(cli.profile.as_deref()).and_then(|profile| {
        let mut session = Session::new(profile);
        match cli.command {
            Commands::View { file, mode, query, target, output } => {
                let spec = ViewSpec {
                    mode: mode.into(),
                    query,
                    target: target.into(),
                    ..ViewSpec::default()
                };
                load(&mut session, Slot::Primary, &file)?;
                cmd_view(&session, &spec, &output)
            }
            Commands::Cross { file, other, by, output } => {
                let spec = ViewSpec {
                    criterion: by.into(),
                    ..ViewSpec::new(ViewMode::Cross)
                };
                load(&mut session, Slot::Primary, &file)?;
                load(&mut session, Slot::Secondary, &other)?;
                cmd_view(&session, &spec, &output)
            }
            Commands::Columns { file, json } => {
                let loaded = load(&mut session, Slot::Primary, &file)?;
                cmd_columns(loaded, json)
            }
        }
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::new(EXIT_WRITE, msg)
    }

    /// Create error from an engine error with its registry exit code.
    pub fn engine(err: SabanaError) -> Self {
        let hint = match &err {
            SabanaError::MissingColumn { .. } => {
                Some("run `sabana columns <FILE>` to see how the headers were mapped".to_string())
            }
            SabanaError::ProfileParse(_) | SabanaError::ProfileValidation(_) => {
                Some("check the file passed with --profile or SABANA_PROFILE".to_string())
            }
            _ => None,
        };
        Self { code: engine_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<SabanaError> for CliError {
    fn from(err: SabanaError) -> Self {
        Self::engine(err)
    }
}

// ============================================================================
// Loading
// ============================================================================

fn load_profile(path: Option<&Path>) -> Result<Profile, CliError> {
    let Some(path) = path else {
        return Ok(Profile::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_PROFILE, format!("cannot read profile '{}': {}", path.display(), e))
    })?;
    let profile = Profile::from_toml(&text)?;
    log::info!("using profile {}", path.display());
    Ok(profile)
}

fn load<'s>(session: &'s mut Session, slot: Slot, path: &Path) -> Result<&'s LoadedTable, CliError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    session
        .load(slot, &name, sabana_io::load_table(path))
        .map_err(|e| {
            let err = CliError::engine(e);
            if err.code == EXIT_UNREADABLE && !path.exists() {
                err.with_hint(format!("no such file: {}", path.display()))
            } else {
                err
            }
        })
}

// ============================================================================
// view / cross
// ============================================================================

#[derive(Serialize)]
struct ViewJson<'a> {
    title: &'a str,
    #[serde(flatten)]
    status: &'a ViewStatus,
    source: &'a str,
    row_count: usize,
    columns: &'a [String],
    rows: &'a [Vec<sabana_engine::Value>],
}

fn cmd_view(session: &Session, spec: &ViewSpec, output: &OutputArgs) -> Result<(), CliError> {
    let outcome = session.run(spec)?;
    report_status(session, &outcome);

    let source = session.primary().map(|t| t.name.as_str()).unwrap_or_default();
    if output.json {
        let doc = ViewJson {
            title: &outcome.title,
            status: &outcome.status,
            source,
            row_count: outcome.table.len(),
            columns: outcome.table.columns(),
            rows: outcome.table.rows(),
        };
        let text = serde_json::to_string_pretty(&doc)
            .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
        println!("{}", text);
    } else {
        print!("{}", util::render_table(&outcome.table, output.rows));
    }
    eprintln!("{}: {} of {} rows ({})", outcome.title, outcome.table.len(), session_rows(session), source);

    if let Some(path) = &output.out {
        write_table(&outcome.table, path)?;
        eprintln!("wrote {}", path.display());
    }
    if let Some(path) = &output.map {
        write_map(session, &outcome, output.map_scope.into(), path)?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn session_rows(session: &Session) -> usize {
    session.primary().map(|t| t.table.len()).unwrap_or(0)
}

fn report_status(session: &Session, outcome: &ViewOutcome) {
    match &outcome.status {
        ViewStatus::AwaitingInput { hint } => eprintln!("hint:  {}", hint),
        ViewStatus::Unavailable { missing } => {
            let names: Vec<&str> = missing.iter().map(|f| f.name()).collect();
            eprintln!(
                "warning: {} needs column(s) {}; showing the full table",
                outcome.title,
                names.join(", ")
            );
        }
        ViewStatus::Matched { shared } => {
            let other = session.secondary().map(|t| t.name.as_str()).unwrap_or_default();
            eprintln!("{} shared identities with {}", shared, other);
        }
        ViewStatus::Applied => {}
    }
}

fn write_table(table: &Table, path: &Path) -> Result<(), CliError> {
    sabana_io::export_table(table, path).map_err(|e| {
        let err = CliError::write(format!("cannot write '{}': {}", path.display(), e));
        if path.extension().is_none() {
            err.with_hint("use a .xlsx, .csv or .json extension")
        } else {
            err
        }
    })
}

fn write_map(session: &Session, outcome: &ViewOutcome, scope: MapScope, path: &Path) -> Result<(), CliError> {
    let points = session.map_points(scope, outcome)?;
    if points.is_empty() {
        let source = match scope {
            MapScope::CurrentView => Some(&outcome.table),
            MapScope::Full => session.primary().map(|t| &t.table),
        };
        let hint = if source.is_some_and(has_coordinates) {
            "no row in this result has both latitud and longitud; try --map-scope full"
        } else {
            "the table has no latitud/longitud columns"
        };
        return Err(CliError::new(EXIT_NO_COORDINATES, "no rows with coordinates to draw").with_hint(hint));
    }
    let title = scope.title(&outcome.title);
    sabana_io::map::export(&points, &session.profile().map, &title, path)
        .map_err(|e| CliError::write(format!("cannot write '{}': {}", path.display(), e)))
}

// ============================================================================
// columns
// ============================================================================

#[derive(Serialize)]
struct ColumnsJson<'a> {
    file: &'a str,
    rows: usize,
    columns: &'a [String],
    report: &'a sabana_engine::NormalizationReport,
}

fn cmd_columns(loaded: &LoadedTable, json: bool) -> Result<(), CliError> {
    let report = &loaded.report;
    if json {
        let doc = ColumnsJson {
            file: &loaded.name,
            rows: loaded.table.len(),
            columns: loaded.table.columns(),
            report,
        };
        let text = serde_json::to_string_pretty(&doc)
            .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    println!("{} ({} rows)", loaded.name, loaded.table.len());
    for field in sabana_engine::Field::ALL {
        let source = report
            .mapped
            .iter()
            .find(|m| m.field == field)
            .map(|m| format!("<- {}", m.column))
            .unwrap_or_else(|| "(missing)".to_string());
        println!("  {}  {}", util::pad_right(field.name(), 9), source);
    }
    for shadowed in &report.shadowed {
        println!("  ignored   {} (also matches {})", shadowed.column, shadowed.field);
    }
    if !report.unmapped.is_empty() {
        println!("  passthrough: {}", report.unmapped.join(", "));
    }
    if report.lines_unknown > 0 {
        println!("  {} line cell(s) set to {}", report.lines_unknown, sabana_engine::UNKNOWN_LINE);
    }
    if report.coordinates_coerced > 0 {
        println!("  {} coordinate cell(s) not numeric, left empty", report.coordinates_coerced);
    }
    Ok(())
}
