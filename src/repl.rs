// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL (Read-Eval-Print Loop) over a margin session.
//!
//! Every line evaluates in the current namespace (a file path), so the
//! session accumulates state per file exactly like the editor integration
//! does. `.file` switches namespaces; `.load` evaluates a whole file into
//! its own namespace.

use margin_engine::lexer::{Scanner, Span, TokenKind};
use margin_engine::{inspect, Value};
use margin_session::{EvalOptions, Session};
use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};
use std::borrow::Cow;
use std::path::PathBuf;

/// REPL configuration constants
const HISTORY_FILE: &str = ".margin_history";
const MAX_HISTORY_SIZE: usize = 1000;

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Version,
    File,
    Load,
    Reset,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let input = input.trim();
        if !input.starts_with('.') {
            return None;
        }

        let parts: Vec<&str> = input[1..].splitn(2, char::is_whitespace).collect();
        let cmd = parts.first()?.to_lowercase();
        let arg = parts.get(1).copied();

        match cmd.as_str() {
            "help" | "h" | "?" => Some((ReplCommand::Help, arg)),
            "exit" | "quit" | "q" => Some((ReplCommand::Exit, arg)),
            "clear" | "cls" => Some((ReplCommand::Clear, arg)),
            "version" | "v" => Some((ReplCommand::Version, arg)),
            "file" | "f" => Some((ReplCommand::File, arg)),
            "load" | "l" => Some((ReplCommand::Load, arg)),
            "reset" => Some((ReplCommand::Reset, arg)),
            _ => None,
        }
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Clear the screen"),
            (".version", "Show version information"),
            (".file <path>", "Switch to another file's namespace"),
            (".load <file>", "Evaluate a file into its own namespace"),
            (".reset", "Forget every namespace in the session"),
        ]
    }
}

/// Helper struct for rustyline that provides completion, hints, and
/// validation
#[derive(Default)]
struct MarginHelper {
    /// Keywords and built-in identifiers for completion
    keywords: Vec<String>,
}

impl MarginHelper {
    fn new() -> Self {
        let keywords = vec![
            // Keywords
            "break",
            "case",
            "catch",
            "class",
            "const",
            "continue",
            "default",
            "delete",
            "do",
            "else",
            "export",
            "false",
            "finally",
            "for",
            "function",
            "if",
            "import",
            "in",
            "instanceof",
            "let",
            "new",
            "null",
            "return",
            "static",
            "this",
            "throw",
            "true",
            "try",
            "typeof",
            "undefined",
            "var",
            "void",
            "while",
            // Module scope
            "module",
            "exports",
            "require",
            "__filename",
            "__dirname",
            // Global objects
            "Array",
            "Boolean",
            "console",
            "Error",
            "JSON",
            "Math",
            "Number",
            "Object",
            "String",
            // Common methods
            "console.log",
            "console.error",
            "console.warn",
            // REPL commands
            ".help",
            ".exit",
            ".clear",
            ".version",
            ".file",
            ".load",
            ".reset",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self { keywords }
    }
}

impl Completer for MarginHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = word_start(line, pos);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((pos, Vec::new()));
        }

        let candidates = self
            .keywords
            .iter()
            .filter(|candidate| candidate.starts_with(word))
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, candidates))
    }
}

impl Hinter for MarginHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }

        let word = &line[word_start(line, line.len())..];
        if word.len() < 2 {
            return None;
        }

        // The shortest continuation keeps hints unobtrusive.
        self.keywords
            .iter()
            .filter(|candidate| candidate.starts_with(word) && candidate.len() > word.len())
            .min_by_key(|candidate| candidate.len())
            .map(|candidate| (&candidate[word.len()..]).dimmed().to_string())
    }
}

/// Start of the identifier-ish word ending at `pos`. Dots are part of the
/// word so dotted chains (`console.lo`) complete as a unit.
fn word_start(line: &str, pos: usize) -> usize {
    line[..pos]
        .rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '$' && c != '.')
        .map_or(0, |i| i + 1)
}

impl Highlighter for MarginHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        // Dot commands are not JavaScript; paint them as a unit.
        if line.starts_with('.') {
            return Cow::Owned(line.magenta().to_string());
        }

        // Lex the line with the engine's scanner and color by token kind.
        // Trivia between tokens (whitespace, comments) stays as written.
        let mut scanner = Scanner::new(line);
        let mut out = String::with_capacity(line.len() * 2);
        let mut cursor = 0;

        loop {
            let token = scanner.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            let Span { start, end } = token.span;
            if start > cursor {
                out.push_str(&line[cursor..start]);
            }
            out.push_str(&color_token(&token.kind, &line[start..end]));
            cursor = end;
        }
        out.push_str(&line[cursor..]);

        Cow::Owned(out)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn color_token(kind: &TokenKind, text: &str) -> String {
    const GLOBALS: &[&str] = &[
        "console", "Math", "JSON", "Object", "Array", "String", "Number", "Boolean", "Error",
        "module", "exports", "require",
    ];

    match kind {
        TokenKind::Number(_) => text.yellow().to_string(),
        TokenKind::String(_) => text.green().to_string(),
        TokenKind::True
        | TokenKind::False
        | TokenKind::Null
        | TokenKind::Undefined
        | TokenKind::This => text.blue().to_string(),
        TokenKind::Identifier(name) if GLOBALS.contains(&name.as_str()) => {
            text.cyan().to_string()
        }
        TokenKind::Identifier(_) | TokenKind::Unexpected(_) => text.to_string(),
        TokenKind::LeftParen
        | TokenKind::RightParen
        | TokenKind::LeftBrace
        | TokenKind::RightBrace
        | TokenKind::LeftBracket
        | TokenKind::RightBracket => text.yellow().to_string(),
        kind if is_keyword(kind) => text.magenta().bold().to_string(),
        _ => text.cyan().to_string(),
    }
}

fn is_keyword(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Var
            | TokenKind::Let
            | TokenKind::Const
            | TokenKind::Function
            | TokenKind::Class
            | TokenKind::Return
            | TokenKind::If
            | TokenKind::Else
            | TokenKind::While
            | TokenKind::Do
            | TokenKind::For
            | TokenKind::Break
            | TokenKind::Continue
            | TokenKind::Throw
            | TokenKind::Try
            | TokenKind::Catch
            | TokenKind::Finally
            | TokenKind::New
            | TokenKind::Delete
            | TokenKind::Typeof
            | TokenKind::Void
            | TokenKind::In
            | TokenKind::Instanceof
            | TokenKind::Import
            | TokenKind::Export
            | TokenKind::Default
    )
}

impl Validator for MarginHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        if pending_input(ctx.input()) {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

/// Whether the input is visibly unfinished: open bracket groups, or a
/// trailing token that demands a right-hand side. Decided over the engine's
/// token stream, so brackets inside strings and comments don't count.
fn pending_input(input: &str) -> bool {
    let mut scanner = Scanner::new(input);
    let mut depth = 0i32;
    let mut last = TokenKind::Eof;

    loop {
        let token = scanner.next_token();
        match token.kind {
            TokenKind::Eof => break,
            TokenKind::LeftParen | TokenKind::LeftBrace | TokenKind::LeftBracket => depth += 1,
            TokenKind::RightParen | TokenKind::RightBrace | TokenKind::RightBracket => depth -= 1,
            _ => {}
        }
        last = token.kind;
    }

    if depth > 0 {
        return true;
    }

    matches!(
        last,
        TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::StarStar
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::Equal
            | TokenKind::Comma
            | TokenKind::Dot
            | TokenKind::Arrow
            | TokenKind::Question
            | TokenKind::Colon
            | TokenKind::AmpersandAmpersand
            | TokenKind::PipePipe
            | TokenKind::QuestionQuestion
    )
}

impl Helper for MarginHelper {}

/// The interactive REPL over a persistent evaluation session
pub struct Repl {
    session: Session,
    namespace: PathBuf,
    editor: Editor<MarginHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new() -> rustyline::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(MarginHelper::new()));

        // Determine history file path
        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("margin")
            .join(HISTORY_FILE);

        // Create parent directory if it doesn't exist
        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        // Load history
        let _ = editor.load_history(&history_path);

        let namespace = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("repl.js");

        Ok(Self {
            session: Session::new(),
            namespace,
            editor,
            history_path,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();

        loop {
            let prompt = self.format_prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();

                    if trimmed.is_empty() {
                        continue;
                    }

                    // Check for REPL commands
                    if let Some((cmd, arg)) = ReplCommand::parse(trimmed) {
                        match self.execute_command(cmd, arg) {
                            CommandResult::Continue => continue,
                            CommandResult::Exit => break,
                        }
                    }

                    // Evaluate in the current namespace
                    self.eval_and_print(trimmed);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => {
                    eprintln!("{}: {:?}", "Error".red().bold(), err);
                    break;
                }
            }
        }

        // Save history
        let _ = self.editor.save_history(&self.history_path);

        println!();
        println!("{}", "Goodbye!".bright_cyan());
        Ok(())
    }

    fn print_banner(&self) {
        let version = env!("CARGO_PKG_VERSION");
        println!();
        println!(
            "  {} {} {}",
            "margin".bright_cyan().bold(),
            "v".dimmed(),
            version.bright_yellow()
        );
        println!(
            "  {}",
            "An inline REPL for JavaScript and TypeScript files".dimmed()
        );
        println!();
        println!(
            "  {} {}",
            "Namespace:".dimmed(),
            self.namespace.display().to_string().green()
        );
        println!(
            "  {} {} {}",
            "Type".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
        println!();
    }

    fn format_prompt(&self) -> String {
        let name = self
            .namespace
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "repl".to_string());
        format!("{}{} ", name.bright_green().bold(), ">".bright_green())
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match cmd {
            ReplCommand::Help => {
                self.print_help();
                CommandResult::Continue
            }
            ReplCommand::Exit => CommandResult::Exit,
            ReplCommand::Clear => {
                print!("\x1B[2J\x1B[H");
                CommandResult::Continue
            }
            ReplCommand::Version => {
                println!();
                println!(
                    "{}: {}",
                    "margin".bright_cyan().bold(),
                    env!("CARGO_PKG_VERSION").yellow()
                );
                println!();
                CommandResult::Continue
            }
            ReplCommand::File => {
                match arg {
                    Some(path) => {
                        self.namespace = absolute(path);
                        println!(
                            "{} {}",
                            "Namespace:".dimmed(),
                            self.namespace.display().to_string().green()
                        );
                    }
                    None => {
                        println!(
                            "{} {}",
                            "Namespace:".dimmed(),
                            self.namespace.display().to_string().green()
                        );
                    }
                }
                CommandResult::Continue
            }
            ReplCommand::Load => {
                if let Some(path) = arg {
                    self.load_file(path);
                } else {
                    eprintln!(
                        "{}: {} {}",
                        "Error".red().bold(),
                        ".load".cyan(),
                        "requires a file path".dimmed()
                    );
                }
                CommandResult::Continue
            }
            ReplCommand::Reset => {
                self.session.reset();
                println!("{}", "Session cleared.".dimmed());
                CommandResult::Continue
            }
        }
    }

    fn print_help(&self) {
        println!();
        println!("{}", "REPL Commands:".white().bold());
        println!();

        for (cmd, desc) in ReplCommand::all_commands() {
            println!("  {:16} {}", cmd.cyan(), desc.dimmed());
        }

        println!();
        println!(
            "  {}",
            "Lines evaluate in the current namespace; bindings persist".dimmed()
        );
        println!(
            "  {}",
            "per file, and imports/exports work across namespaces.".dimmed()
        );
        println!();
    }

    fn load_file(&mut self, path: &str) {
        let path = absolute(path.trim());
        match self
            .session
            .evaluate_file(&path, EvalOptions::with_imports())
        {
            Ok(value) => {
                self.flush_console();
                println!("{}", format_value(&value));
            }
            Err(err) => {
                self.flush_console();
                eprintln!("{}", err.to_string().red());
            }
        }
    }

    fn eval_and_print(&mut self, input: &str) {
        match self
            .session
            .evaluate(&self.namespace, input, EvalOptions::with_imports())
        {
            Ok(value) => {
                self.flush_console();
                println!("{}", format_value(&value));
            }
            Err(err) => {
                self.flush_console();
                eprintln!("{}", err.to_string().red());
            }
        }
    }

    /// Print whatever the fragment wrote via console.* during the call.
    fn flush_console(&self) {
        let (stdout, stderr) = self.session.drain_console();
        if !stdout.is_empty() {
            print!("{}", stdout);
        }
        if !stderr.is_empty() {
            eprint!("{}", stderr.red());
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

fn absolute(path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

/// Format a value for display with syntax coloring
fn format_value(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".blue().dimmed().to_string(),
        Value::Null => "null".blue().to_string(),
        Value::Boolean(b) => b.to_string().yellow().to_string(),
        Value::Number(_) => value.to_js_string().yellow().to_string(),
        Value::String(s) => format!("'{}'", s).green().to_string(),
        Value::Object(_) => inspect(value).cyan().to_string(),
        Value::Function(_) => value.to_js_string().magenta().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert!(matches!(
            ReplCommand::parse(".help"),
            Some((ReplCommand::Help, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".exit"),
            Some((ReplCommand::Exit, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".file src/app.ts"),
            Some((ReplCommand::File, Some("src/app.ts")))
        ));
        assert!(matches!(
            ReplCommand::parse(".reset"),
            Some((ReplCommand::Reset, None))
        ));
        assert!(ReplCommand::parse("not a command").is_none());
    }

    #[test]
    fn test_pending_input() {
        assert!(pending_input("function sum(xs) {"));
        assert!(pending_input("const total ="));
        assert!(pending_input("xs.map(x =>"));
        assert!(!pending_input("sum([1, 2, 3])"));
        assert!(!pending_input("'a string with { inside'"));
        assert!(!pending_input("1 + 1 // trailing comment"));
    }

    #[test]
    fn test_word_start() {
        assert_eq!(word_start("console.lo", 10), 0);
        assert_eq!(word_start("1 + con", 7), 4);
        assert_eq!(word_start("", 0), 0);
    }
}
