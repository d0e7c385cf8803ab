use clap::{App, Arg, ArgMatches, ErrorKind};
use lox::diagnostics::{Diagnostics, ExitCode};
use lox::printer::AstPrinter;
use lox::{parser, scanner, Lox};
use std::fs;
use std::io::{self, BufRead, Write};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    init_tracing();
    let matches = App::new("lox")
        .about("Tree-walking interpreter for the Lox scripting language")
        .arg(Arg::with_name("script").help("Script to run; starts a prompt if omitted"))
        .arg(
            Arg::with_name("tokens")
                .long("tokens")
                .help("Print the scanned tokens and stop"),
        )
        .arg(
            Arg::with_name("ast")
                .long("ast")
                .conflicts_with("tokens")
                .help("Print the parsed syntax tree and stop"),
        )
        .get_matches_safe()
        .unwrap_or_else(|e| match e.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => {
                println!("{}", e.message);
                std::process::exit(ExitCode::Ok.into());
            }
            _ => {
                eprintln!("{}", e.message);
                std::process::exit(ExitCode::Usage.into());
            }
        });

    let code = match matches.value_of("script") {
        Some(file) => run_file(file, &matches),
        None => run_prompt(),
    };
    std::process::exit(code.into());
}

// Only initialize if RUST_LOG is set
fn init_tracing() {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_file(file: &str, matches: &ArgMatches) -> ExitCode {
    let contents = match fs::read_to_string(file) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Could not read {}: {}", file, e);
            return ExitCode::NoInput;
        }
    };
    let diagnostics = if matches.is_present("tokens") {
        dump_tokens(&contents)
    } else if matches.is_present("ast") {
        dump_ast(&contents)
    } else {
        Lox::new().run(&contents)
    };
    report(&diagnostics);
    diagnostics.exit_code()
}

fn run_prompt() -> ExitCode {
    let mut lox = Lox::new();
    let stdin = io::stdin();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return ExitCode::Ok;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return ExitCode::Ok,
            Ok(_) => (),
        }
        report(&lox.run(&terminate(&line)));
    }
}

/// Lets the prompt accept `1 + 2` as well as `1 + 2;`.
fn terminate(line: &str) -> String {
    let trimmed = line.trim_end();
    if trimmed.is_empty() || trimmed.ends_with(';') || trimmed.ends_with('}') {
        line.to_string()
    } else {
        format!("{};", trimmed)
    }
}

fn report(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic);
    }
}

fn dump_tokens(source: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    for token in scanner::scan_tokens(source, &mut diagnostics) {
        println!("{}", token);
    }
    diagnostics
}

fn dump_ast(source: &str) -> Diagnostics {
    let (lines, diagnostics) = render_ast(source);
    for line in lines {
        println!("{}", line);
    }
    diagnostics
}

/// Renders every statement, or nothing at all if the source has errors.
fn render_ast(source: &str) -> (Vec<String>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let tokens = scanner::scan_tokens(source, &mut diagnostics);
    if diagnostics.had_error() {
        return (Vec::new(), diagnostics);
    }
    let statements = parser::parse(&tokens, &mut diagnostics);
    if diagnostics.had_error() {
        return (Vec::new(), diagnostics);
    }
    let lines = statements
        .iter()
        .map(|s| AstPrinter.statement(s))
        .collect();
    (lines, diagnostics)
}
