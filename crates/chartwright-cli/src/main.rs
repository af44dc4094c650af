mod script;

use chartwright_core::{Document, DocumentCodec, Editor, EditorConfig, JsonCodec, invariants};
use script::{ScriptOp, StepReport};
use serde::Serialize;
use std::io::Read;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Core(chartwright_core::Error),
    Json(serde_json::Error),
    Invalid(Vec<String>),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Core(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Invalid(violations) => {
                writeln!(f, "document violates {} invariant(s):", violations.len())?;
                for v in violations {
                    writeln!(f, "  - {v}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<chartwright_core::Error> for CliError {
    fn from(value: chartwright_core::Error) -> Self {
        match value {
            chartwright_core::Error::InvalidDocument { violations } => Self::Invalid(violations),
            other => Self::Core(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Validate,
    Stats,
    Apply,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    script: Option<String>,
    config: Option<String>,
    out: Option<String>,
    report: bool,
}

fn usage() -> &'static str {
    "chartwright\n\
\n\
USAGE:\n\
  chartwright [validate] [--config <path>] [<path>|-]\n\
  chartwright stats [--pretty] [<path>|-]\n\
  chartwright apply --script <ops.json> [--config <path>] [--out <path>] [--pretty]\n\
                    [--report] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the document is read from stdin.\n\
  - validate exits with status 1 and lists the violations when the document is invalid.\n\
  - apply replays a JSON array of operations such as {\"op\": \"createState\", ...} or\n\
    {\"op\": \"undo\"} and prints the resulting document, or writes it to --out. --report\n\
    prints per-operation results to stderr.\n\
  - Set CHARTWRIGHT_LOG (e.g. debug, chartwright_core=trace) to control log output.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "validate" => args.command = Command::Validate,
            "stats" => args.command = Command::Stats,
            "apply" => args.command = Command::Apply,
            "--pretty" => args.pretty = true,
            "--report" => args.report = true,
            "--script" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.script = Some(path.clone());
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    if matches!(args.command, Command::Apply) && args.script.is_none() {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<EditorConfig, CliError> {
    match path {
        None => Ok(EditorConfig::default()),
        Some(path) => Ok(EditorConfig::from_json_str(&std::fs::read_to_string(path)?)?),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("CHARTWRIGHT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MachineStats<'a> {
    id: &'a str,
    name: Option<&'a str>,
    platform: &'a str,
    states: usize,
    initial_states: usize,
    final_states: usize,
    choice_states: usize,
    transitions: usize,
    notes: usize,
    components: usize,
    max_depth: usize,
}

fn stats(doc: &Document) -> Vec<MachineStats<'_>> {
    use chartwright_core::NodeKindTag;

    doc.machines
        .iter()
        .map(|(id, sm)| {
            let count = |tag: NodeKindTag| sm.nodes.values().filter(|n| n.tag() == tag).count();
            let max_depth = sm
                .nodes
                .keys()
                .map(|node_id| {
                    let mut depth = 0;
                    let mut cur = sm.nodes.get(node_id).and_then(|n| n.parent_id.as_deref());
                    while let Some(parent) = cur {
                        depth += 1;
                        if depth > sm.nodes.len() {
                            break;
                        }
                        cur = sm.nodes.get(parent).and_then(|n| n.parent_id.as_deref());
                    }
                    depth
                })
                .max()
                .unwrap_or(0);
            MachineStats {
                id,
                name: sm.name.as_deref(),
                platform: &sm.platform,
                states: count(NodeKindTag::State),
                initial_states: count(NodeKindTag::Initial),
                final_states: count(NodeKindTag::Final),
                choice_states: count(NodeKindTag::Choice),
                transitions: sm.transitions.len(),
                notes: sm.notes.len(),
                components: sm.components.len(),
                max_depth,
            }
        })
        .collect()
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let text = read_input(args.input.as_deref())?;
    let codec = JsonCodec { pretty: args.pretty };

    match args.command {
        Command::Validate => {
            let doc = codec.decode(&text)?;
            let violations = invariants::check_document(&doc);
            if !violations.is_empty() {
                return Err(CliError::Invalid(violations.iter().map(ToString::to_string).collect()));
            }
            println!("ok: {} state machine(s)", doc.machines.len());
            Ok(())
        }
        Command::Stats => {
            let doc = codec.decode(&text)?;
            write_json(&stats(&doc), args.pretty)
        }
        Command::Apply => {
            let Some(script_path) = args.script.as_deref() else {
                return Err(CliError::Usage(usage()));
            };
            let ops: Vec<ScriptOp> = serde_json::from_str(&std::fs::read_to_string(script_path)?)?;

            let mut editor = Editor::new(config);
            // An empty input starts from an empty document.
            if !text.trim().is_empty() {
                editor.load_with(&codec, &text)?;
            }
            let reports: Vec<StepReport> = ops
                .into_iter()
                .enumerate()
                .map(|(index, op)| script::apply(&mut editor, index, op))
                .collect();
            let rejected = reports.iter().filter(|r| !r.applied).count();
            tracing::info!(
                ops = reports.len(),
                rejected,
                modified = editor.is_modified(),
                "script replayed"
            );
            if args.report {
                serde_json::to_writer_pretty(std::io::stderr().lock(), &reports)?;
                eprintln!();
            }

            let out = editor.save_with(&codec)?;
            match args.out.as_deref() {
                None | Some("-") => println!("{out}"),
                Some(path) => std::fs::write(path, out)?,
            }
            Ok(())
        }
    }
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
