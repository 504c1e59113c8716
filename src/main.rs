//! `frameboard` replay tool.
//!
//! Loads a review snapshot and a scripted list of input events, drives the
//! canvas engine against the in-memory store, waits for every write to
//! resolve, and prints the resulting document as JSON. Useful for
//! reproducing interaction bugs outside the browser.


use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use frameboard::config::{ConfigError, EngineConfig};
use frameboard::coords::{CssPoint, CssRect, NormalizedPoint, Size};
use frameboard::doc::{Annotation, AnnotationKind, Comment, EntityId};
use frameboard::engine::{Action, Engine};
use frameboard::input::{Button, Key, Modifiers, PointerTarget, Tool};
use frameboard::persist::MemoryStore;
use frameboard::session::SharedSession;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON in {path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "frameboard", about = "Replay scripted canvas input against a review snapshot")]
struct Cli {
    /// Snapshot JSON: `{ "annotations": [...], "comments": [...] }`.
    #[arg(long, env = "FRAMEBOARD_SESSION")]
    session: PathBuf,

    /// Script JSON: an array of steps.
    #[arg(long, env = "FRAMEBOARD_SCRIPT")]
    script: PathBuf,

    /// Container width in CSS pixels.
    #[arg(long, default_value_t = 1000.0)]
    width: f64,

    /// Container height in CSS pixels.
    #[arg(long, default_value_t = 500.0)]
    height: f64,

    /// Native media width; defaults to the container width.
    #[arg(long)]
    native_width: Option<f64>,

    /// Native media height; defaults to the container height.
    #[arg(long)]
    native_height: Option<f64>,

    /// Frame shown when the script starts.
    #[arg(long, default_value_t = 0)]
    frame: u32,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct Snapshot {
    #[serde(default)]
    annotations: Vec<Annotation>,
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum ToolName {
    Select,
    Comment,
    Circle,
    Rectangle,
    Arrow,
    Freehand,
    Text,
}

impl From<ToolName> for Tool {
    fn from(name: ToolName) -> Self {
        match name {
            ToolName::Select => Tool::Select,
            ToolName::Comment => Tool::Comment,
            ToolName::Circle => Tool::Draw(AnnotationKind::Circle),
            ToolName::Rectangle => Tool::Draw(AnnotationKind::Rectangle),
            ToolName::Arrow => Tool::Draw(AnnotationKind::Arrow),
            ToolName::Freehand => Tool::Draw(AnnotationKind::Freehand),
            ToolName::Text => Tool::Draw(AnnotationKind::Text),
        }
    }
}

/// One scripted input. Pointer coordinates are CSS pixels; comment and text
/// positions are normalized.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Step {
    Frame { frame: u32 },
    Tool { tool: ToolName },
    Down {
        x: f64,
        y: f64,
        #[serde(default)]
        shift: bool,
        #[serde(default)]
        interactive: bool,
    },
    Move {
        x: f64,
        y: f64,
        #[serde(default)]
        shift: bool,
    },
    Up {
        x: f64,
        y: f64,
        #[serde(default)]
        shift: bool,
    },
    Cancel,
    Key {
        key: String,
        #[serde(default)]
        shift: bool,
    },
    Comment { x: f64, y: f64, text: String },
    Text { x: f64, y: f64, text: String },
    Reply { id: Uuid, text: String },
    Resolve { id: Uuid },
    Settle,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    selection: Vec<EntityId>,
    failures: Vec<String>,
    annotations: Vec<Annotation>,
    comments: Vec<Comment>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_owned(), source })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json { path: path.to_owned(), source })
}

fn shifted(shift: bool) -> Modifiers {
    Modifiers { shift, ..Modifiers::default() }
}

fn apply(engine: &mut Engine, step: Step) -> Vec<Action> {
    match step {
        Step::Frame { frame } => engine.set_frame(frame, 0.0),
        Step::Tool { tool } => engine.set_tool(tool.into()),
        Step::Down { x, y, shift, interactive } => {
            let target = if interactive { PointerTarget::Interactive } else { PointerTarget::Canvas };
            engine.on_pointer_down(CssPoint::new(x, y), Button::Primary, shifted(shift), target)
        }
        Step::Move { x, y, shift } => engine.on_pointer_move(CssPoint::new(x, y), shifted(shift)),
        Step::Up { x, y, shift } => engine.on_pointer_up(CssPoint::new(x, y), Button::Primary, shifted(shift)),
        Step::Cancel => engine.on_pointer_cancel(),
        Step::Key { key, shift } => engine.on_key_down(&Key(key), shifted(shift)),
        Step::Comment { x, y, text } => engine.add_comment(NormalizedPoint::new(x, y), &text),
        Step::Text { x, y, text } => engine.add_text(NormalizedPoint::new(x, y), &text),
        Step::Reply { id, text } => engine.reply(&id, &text),
        Step::Resolve { id } => engine.toggle_comment_resolution(&id),
        // Settling is async; handled by the caller.
        Step::Settle => Vec::new(),
    }
}

fn failures(actions: &[Action]) -> impl Iterator<Item = String> + '_ {
    actions.iter().filter_map(|action| match action {
        Action::PersistFailed { op, code, message, .. } => Some(format!("{op}: {code}: {message}")),
        _ => None,
    })
}

async fn run(cli: Cli) -> Result<Report, CliError> {
    let config = EngineConfig::from_env()?;
    let snapshot: Snapshot = read_json(&cli.session)?;
    let steps: Vec<Step> = read_json(&cli.script)?;
    info!(
        annotations = snapshot.annotations.len(),
        comments = snapshot.comments.len(),
        steps = steps.len(),
        "replaying script"
    );

    let store = Arc::new(MemoryStore::with_snapshot(snapshot.annotations.clone(), snapshot.comments.clone()));
    let mut engine = Engine::new(config, store.clone(), SharedSession::default());
    engine.load_snapshot(snapshot.annotations, snapshot.comments);
    let native = Size::new(cli.native_width.unwrap_or(cli.width), cli.native_height.unwrap_or(cli.height));
    engine.set_viewport(CssRect::new(0.0, 0.0, cli.width, cli.height), native);
    engine.set_frame(cli.frame, 0.0);

    let mut failed = Vec::new();
    for step in steps {
        let actions = if matches!(step, Step::Settle) { engine.settle().await } else { apply(&mut engine, step) };
        failed.extend(failures(&actions));
    }
    failed.extend(failures(&engine.settle().await));
    for failure in &failed {
        warn!(%failure, "write failed during replay");
    }

    let (annotations, comments) = store.snapshot();
    Ok(Report { selection: engine.selection().to_vec(), failures: failed, annotations, comments })
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let report = match run(cli).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };
    match serde_json::to_string_pretty(&report).map_err(CliError::from) {
        Ok(json) => {
            println!("{json}");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
