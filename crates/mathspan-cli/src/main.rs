use std::{
    fmt::Write as _,
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use clap::Parser;
use tracing::debug;

use mathspan::{
    ConversionError, MathSpan, Node, Passthrough, Render, Replacer, ScannerConfig, line_and_col,
    tokenize_with,
};

mod config_file;
mod logging;
mod mathml;

use config_file::{Config, load_config_file};
use mathml::MathMLRenderer;

/// Finds `$...$` and `$$...$$` math in text files and converts it to MathML
#[derive(Parser, Debug)]
#[command(version, about = "Finds math regions in text and converts them to MathML", long_about = None)]
struct Args {
    /// The file to process; reads from stdin if absent or "-"
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Reads settings from a TOML file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of lines searched for the closing `$$` of a block
    #[arg(long, value_name = "N")]
    lookahead_lines: Option<usize>,

    /// Look recursively for Markdown files in the given directory
    #[arg(short, long)]
    recursive: bool,

    /// Dry run: convert but don't write anything
    #[arg(long)]
    dry_run: bool,

    /// If true, the program continues to convert when an error occurs
    #[arg(long)]
    continue_on_error: bool,

    /// Prints the math regions that were found instead of converting them
    #[arg(short, long, conflicts_with = "passthrough")]
    list_spans: bool,

    /// Leaves math regions untouched
    #[arg(long)]
    passthrough: bool,
}

/// What happens to the math regions of a document.
enum Action {
    List,
    Passthrough,
    MathML(MathMLRenderer),
}

struct Job {
    scanner: ScannerConfig,
    replacer: Replacer,
    action: Action,
    dry_run: bool,
}

fn main() {
    logging::init_tracing();
    let args = Args::parse();

    let mut config = match args.config {
        Some(ref path) => load_config_file(path).unwrap_or_else(|e| exit_config_error(e, path)),
        None => Config::default(),
    };
    args.apply_overrides(&mut config);
    debug!(scanner = ?config.scanner, "configuration loaded");

    let action = if args.list_spans {
        Action::List
    } else if args.passthrough {
        Action::Passthrough
    } else {
        match MathMLRenderer::new(config.math_core) {
            Ok(renderer) => Action::MathML(renderer),
            Err((e, idx, definition)) => {
                eprintln!("Invalid macro #{} ({}): {}", idx + 1, definition, e);
                std::process::exit(1);
            }
        }
    };
    let mut job = Job {
        scanner: config.scanner,
        replacer: Replacer::new(args.continue_on_error),
        action,
        dry_run: args.dry_run,
    };

    match args.file {
        Some(ref path) if path != Path::new("-") => {
            if args.recursive {
                job.convert_recursive(path);
            } else {
                job.convert_file(path);
            }
        }
        _ => {
            let input = read_stdin();
            if let Some(output) = job.transform(&input, "<stdin>") {
                print!("{}", output);
            }
        }
    }
}

impl Args {
    /// Command-line settings take precedence over the config file.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(lines) = self.lookahead_lines {
            config.scanner.lookahead_lines = lines;
        }
    }
}

fn read_stdin() -> String {
    let mut buffer = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut buffer) {
        exit_io_error(e);
    }
    buffer
}

impl Job {
    /// Processes one document. Returns the converted text, or `None` when only listing.
    fn transform(&mut self, input: &str, name: &str) -> Option<String> {
        let nodes = tokenize_with(input, self.scanner);
        debug!(name, nodes = nodes.len(), "tokenized");
        match &mut self.action {
            Action::List => {
                print!("{}", list_spans(input, &nodes, name));
                None
            }
            Action::Passthrough => Some(replace(
                &self.replacer,
                input,
                &nodes,
                &mut Passthrough,
                name,
            )),
            Action::MathML(renderer) => {
                renderer.reset();
                Some(replace(&self.replacer, input, &nodes, renderer, name))
            }
        }
    }

    /// Convert all Markdown files in a directory tree.
    ///
    /// Only files with the extension `.md` are touched.
    fn convert_recursive(&mut self, path: &Path) {
        if path.is_dir() {
            let dir = fs::read_dir(path).unwrap_or_else(|e| exit_io_error(e));
            for entry in dir.filter_map(Result::ok) {
                self.convert_recursive(entry.path().as_ref());
            }
        } else if path.is_file()
            && let Some(ext) = path.extension()
            && ext == "md"
        {
            self.convert_file(path);
        }
    }

    fn convert_file(&mut self, fp: &Path) {
        let original = fs::read_to_string(fp).unwrap_or_else(|e| exit_io_error(e));
        let name = fp.display().to_string();
        let Some(converted) = self.transform(&original, &name) else {
            return;
        };
        if !self.dry_run && original != converted {
            debug!(file = %name, "writing");
            let mut fp = fs::File::create(fp).unwrap_or_else(|e| exit_io_error(e));
            fp.write_all(converted.as_bytes())
                .unwrap_or_else(|e| exit_io_error(e));
        }
    }
}

fn replace<R>(
    replacer: &Replacer,
    input: &str,
    nodes: &[Node],
    renderer: &mut R,
    name: &str,
) -> String
where
    R: Render,
    R::Error: LatexReport,
{
    replacer
        .replace(input, nodes, renderer)
        .unwrap_or_else(|e| exit_conversion_error(&e, name))
}

/// One line per math region: `name:line:col display "content"`.
fn list_spans(input: &str, nodes: &[Node], name: &str) -> String {
    let mut out = String::new();
    for node in nodes {
        if let Node::Math { display, segment } = *node {
            let (line, col) = line_and_col(segment.start, input);
            let _ = writeln!(
                out,
                "{}:{}:{} {} {:?}",
                name,
                line,
                col,
                display.as_str(),
                &input[segment.range()]
            );
        }
    }
    out
}

/// Renderer errors that can print a detailed report of where the LaTeX went wrong.
trait LatexReport: std::error::Error {
    fn write_report(
        &self,
        _name: &str,
        _latex: &str,
        _out: &mut dyn Write,
    ) -> std::io::Result<()> {
        Ok(())
    }
}

impl LatexReport for std::convert::Infallible {}

impl LatexReport for Box<math_core::LatexError> {
    fn write_report(&self, name: &str, latex: &str, out: &mut dyn Write) -> std::io::Result<()> {
        self.to_report(name, true)
            .write((name, ariadne::Source::from(latex)), out)
    }
}

/// Writes the report to `out`; if that fails, writes the plain message to `fallback`.
fn report_latex_error<E: LatexReport>(
    error: &E,
    name: &str,
    latex: &str,
    out: &mut dyn Write,
    fallback: &mut dyn Write,
) {
    if error.write_report(name, latex, out).is_err() {
        let _ = writeln!(fallback, "{}", error);
    }
}

fn exit_conversion_error<E: LatexReport>(e: &ConversionError<E>, name: &str) -> ! {
    eprintln!("Conversion error in '{}': {}", name, e);
    let span = MathSpan {
        display: e.display,
        offset: e.offset,
        raw: &e.raw,
    };
    report_latex_error(
        &e.error,
        name,
        span.content(),
        &mut std::io::stderr(),
        &mut std::io::stderr(),
    );
    std::process::exit(2);
}

fn exit_config_error(e: config_file::ConfigError, fp: &Path) -> ! {
    eprintln!("Config error in '{}': {}", fp.display(), e);
    std::process::exit(1);
}

fn exit_io_error(e: std::io::Error) -> ! {
    eprintln!("IO Error: {}", e);
    std::process::exit(1);
}
