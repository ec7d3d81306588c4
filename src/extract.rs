//! Round-trip extraction of hand-written code from a previously generated C main module.
//!
//! The source is scanned once, line by line, through four sections delimited by marker
//! comments (`Definitions`, `Private Functions`, `Public Functions`). Function boundaries
//! are found by counting braces: depth 0 -> 1 opens a function, the return to 0 closes it.
//!
//! Command handlers are recognised by the generated name `{Protocol}Execute{Command}`
//! appearing anywhere in the function signature. Renaming a handler detaches its body,
//! which is then kept as an unknown private function.

use crate::model::Command;
use std::collections::BTreeMap;

const DEFINITIONS_MARKER: &str = "Definitions";
const PRIVATE_MARKER: &str = "Private Functions";
const PUBLIC_MARKER: &str = "Public Functions";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("line {line}: closing brace without matching opening brace")]
    NegativeBraceDepth { line: usize },
    #[error("function starting at line {line} is never closed")]
    UnterminatedFunction { line: usize },
    #[error("section marker {0:?} not found")]
    MissingSection(&'static str),
}

/// A public function recovered from a previous run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicFunction {
    /// Declarations found between the previous function and this one's doc block.
    /// Written back to the source file only.
    pub preceding_code: String,
    /// Leading doc-comment block, reused as is in the header file.
    pub header: String,
    /// Signature lines up to the opening brace.
    pub signature: String,
    /// Signature and body through the closing brace.
    pub body: String,
}

impl PublicFunction {
    /// Header prototype: the signature with the opening brace replaced by `;`.
    pub fn prototype(&self) -> String {
        let sig = match self.signature.find('{') {
            Some(i) => &self.signature[..i],
            None => self.signature.as_str(),
        };
        format!("{};", sig.trim_end())
    }
}

/// Everything recovered from one generated main module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedCode {
    /// Lines before the `Definitions` marker.
    pub includes: String,
    /// Lines between the `Definitions` and `Private Functions` markers.
    pub definitions: String,
    /// Handler bodies (signature through closing brace) keyed by command name.
    pub command_functions: BTreeMap<String, String>,
    /// Private functions the generator does not own, doc comment included.
    pub unknown_private_functions: Vec<String>,
    /// Lines between `default:` and its `break;` in the dispatcher.
    pub default_command_handler: Option<String>,
    /// Lines after the last private function, before the `Public Functions` marker.
    pub private_trailing_code: String,
    pub public_functions: Vec<PublicFunction>,
    /// Lines after the last public function.
    pub public_trailing_code: String,
}

impl ExtractedCode {
    pub fn command_function(&self, command: &str) -> Option<&str> {
        self.command_functions.get(command).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractState {
    Includes,
    Definitions,
    PrivateFunctions,
    PublicFunctions,
    End,
}

/// Stateful extractor keeping the result of the last successful run.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    protocol_name: String,
    code: ExtractedCode,
    complete: bool,
}

impl CodeExtractor {
    pub fn new(protocol_name: impl Into<String>) -> Self {
        CodeExtractor {
            protocol_name: protocol_name.into(),
            code: ExtractedCode::default(),
            complete: false,
        }
    }

    /// Scan `source`. On failure the previously extracted code is left untouched and the
    /// extractor reports itself incomplete.
    pub fn extract(&mut self, source: &str, commands: &[Command]) -> Result<(), ExtractError> {
        match extract(&self.protocol_name, source, commands) {
            Ok(code) => {
                self.code = code;
                self.complete = true;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(protocol = %self.protocol_name, error = %e, "extraction incomplete");
                self.complete = false;
                Err(e)
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Extracted code, only when the last run completed.
    pub fn code(&self) -> Option<&ExtractedCode> {
        self.complete.then_some(&self.code)
    }
}

/// Decode a source file as UTF-8, falling back to Latin-1.
pub fn decode_source(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// One-shot extraction of `source`, see [`CodeExtractor`].
pub fn extract(protocol_name: &str, source: &str, commands: &[Command]) -> Result<ExtractedCode, ExtractError> {
    let mut code = ExtractedCode::default();
    let mut state = ExtractState::Includes;
    let mut scanner = FunctionScanner::default();
    let patterns = HandlerPatterns::new(protocol_name, commands);

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        match state {
            ExtractState::Includes => {
                if is_marker(line, DEFINITIONS_MARKER) {
                    state = ExtractState::Definitions;
                } else {
                    push_line(&mut code.includes, line);
                }
            }
            ExtractState::Definitions => {
                if is_marker(line, PRIVATE_MARKER) {
                    state = ExtractState::PrivateFunctions;
                } else {
                    push_line(&mut code.definitions, line);
                }
            }
            ExtractState::PrivateFunctions => {
                if !scanner.in_function() && is_marker(line, PUBLIC_MARKER) {
                    code.private_trailing_code = join_lines(&scanner.pending);
                    scanner = FunctionScanner::default();
                    state = ExtractState::PublicFunctions;
                    continue;
                }
                if let Some(func) = scanner.feed(line, line_no)? {
                    classify_private(&mut code, &patterns, func);
                }
            }
            ExtractState::PublicFunctions => {
                if let Some(func) = scanner.feed(line, line_no)? {
                    code.public_functions.push(PublicFunction {
                        preceding_code: join_lines(&func.leading),
                        header: join_lines(&func.doc),
                        signature: join_lines(&func.signature),
                        body: join_lines(&func.lines),
                    });
                }
            }
            ExtractState::End => break,
        }
    }
    if state == ExtractState::PublicFunctions {
        code.public_trailing_code = join_lines(&scanner.pending);
        state = ExtractState::End;
    }

    match state {
        ExtractState::Includes => return Err(ExtractError::MissingSection(DEFINITIONS_MARKER)),
        ExtractState::Definitions => return Err(ExtractError::MissingSection(PRIVATE_MARKER)),
        ExtractState::PrivateFunctions => return Err(ExtractError::MissingSection(PUBLIC_MARKER)),
        ExtractState::PublicFunctions | ExtractState::End => {}
    }
    if let Some(line) = scanner.open_since {
        return Err(ExtractError::UnterminatedFunction { line });
    }
    tracing::debug!(
        protocol = protocol_name,
        handlers = code.command_functions.len(),
        unknown = code.unknown_private_functions.len(),
        public = code.public_functions.len(),
        "extracted previous main module"
    );
    Ok(code)
}

/// Generated function names looked up in private function signatures.
struct HandlerPatterns {
    dispatcher: String,
    sender: String,
    /// (`{Protocol}Execute{Command}`, command name), longest names first.
    handlers: Vec<(String, String)>,
}

impl HandlerPatterns {
    fn new(protocol_name: &str, commands: &[Command]) -> Self {
        let mut handlers: Vec<(String, String)> = commands
            .iter()
            .map(|c| (format!("{}Execute{}", protocol_name, c.name), c.name.clone()))
            .collect();
        handlers.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        HandlerPatterns {
            dispatcher: format!("{}DispatchCommand", protocol_name),
            sender: format!("{}SendCommand", protocol_name),
            handlers,
        }
    }

    fn command_for<'p>(&'p self, signature: &str) -> Option<&'p str> {
        self.handlers
            .iter()
            .find(|(pattern, _)| signature.contains(pattern.as_str()))
            .map(|(_, name)| name.as_str())
    }
}

fn classify_private(code: &mut ExtractedCode, patterns: &HandlerPatterns, func: ScannedFunction<'_>) {
    let signature = func.signature.join("\n");
    let owned = signature.contains(&patterns.dispatcher)
        || signature.contains(&patterns.sender)
        || patterns.command_for(&signature).is_some();
    if owned && !func.leading.is_empty() {
        // the doc block is regenerated, keep whatever sat above it
        code.unknown_private_functions.push(join_lines(&func.leading));
    }
    if signature.contains(&patterns.dispatcher) {
        code.default_command_handler = extract_default_command_handler(&func.lines);
    } else if signature.contains(&patterns.sender) {
        // regenerated every time
    } else if let Some(name) = patterns.command_for(&signature) {
        code.command_functions
            .entry(name.to_string())
            .or_insert_with(|| join_lines(&func.lines));
    } else {
        let mut text = join_lines(&func.leading);
        text.push_str(&join_lines(&func.doc));
        text.push_str(&join_lines(&func.lines));
        code.unknown_private_functions.push(text);
    }
}

/// Body of the `default:` arm of a dispatcher, up to the `break;` closing that arm.
pub fn extract_default_command_handler(lines: &[&str]) -> Option<String> {
    let mut depth: i32 = 0;
    let mut default_depth = None;
    let mut body = String::new();
    for line in lines {
        let trimmed = line.trim();
        match default_depth {
            None if trimmed.starts_with("default:") => {
                default_depth = Some(depth);
            }
            Some(d) if code_part(line).trim() == "break;" && depth == d => return Some(body),
            Some(_) => push_line(&mut body, line),
            None => {}
        }
        depth += brace_delta(line);
    }
    None
}

/// Function split out of a section by [`FunctionScanner`].
struct ScannedFunction<'s> {
    /// Lines above the doc block that belong to no function.
    leading: Vec<&'s str>,
    /// Comment block directly above the signature.
    doc: Vec<&'s str>,
    /// Non-comment lines up to and including the opening brace line.
    signature: Vec<&'s str>,
    /// Signature through closing brace.
    lines: Vec<&'s str>,
}

#[derive(Default)]
struct FunctionScanner<'s> {
    depth: i32,
    pending: Vec<&'s str>,
    leading: Vec<&'s str>,
    doc: Vec<&'s str>,
    signature: Vec<&'s str>,
    lines: Vec<&'s str>,
    /// Line number of the opening brace of the function being read.
    open_since: Option<usize>,
}

impl<'s> FunctionScanner<'s> {
    fn in_function(&self) -> bool {
        self.open_since.is_some()
    }

    fn feed(&mut self, line: &'s str, line_no: usize) -> Result<Option<ScannedFunction<'s>>, ExtractError> {
        let mut opened = false;
        for c in code_part(line).chars() {
            match c {
                '{' => {
                    self.depth += 1;
                    opened = true;
                }
                '}' => {
                    self.depth -= 1;
                    if self.depth < 0 {
                        return Err(ExtractError::NegativeBraceDepth { line: line_no });
                    }
                }
                _ => {}
            }
        }

        if !self.in_function() {
            if !opened {
                if !line.trim().is_empty() {
                    self.pending.push(line);
                }
                return Ok(None);
            }
            self.start(line, line_no);
        } else {
            self.lines.push(line);
        }

        if self.depth == 0 {
            self.open_since = None;
            return Ok(Some(ScannedFunction {
                leading: std::mem::take(&mut self.leading),
                doc: std::mem::take(&mut self.doc),
                signature: std::mem::take(&mut self.signature),
                lines: std::mem::take(&mut self.lines),
            }));
        }
        Ok(None)
    }

    fn start(&mut self, line: &'s str, line_no: usize) {
        let pending = std::mem::take(&mut self.pending);
        let sig_start = pending
            .iter()
            .rposition(|l| is_comment_line(l) || is_statement_line(l))
            .map_or(0, |i| i + 1);
        let doc_start = pending[..sig_start]
            .iter()
            .rposition(|l| !is_comment_line(l))
            .map_or(0, |i| i + 1);
        self.leading = pending[..doc_start].to_vec();
        self.doc = pending[doc_start..sig_start].to_vec();
        self.signature = pending[sig_start..].to_vec();
        self.signature.push(line);
        self.lines = self.signature.clone();
        self.open_since = Some(line_no);
    }
}

/// Section markers are `// *** Name ***` lines, never doc text mentioning the name.
fn is_marker(line: &str, marker: &str) -> bool {
    let t = line.trim();
    t.starts_with("// ***") && t.contains(marker)
}

/// A line that cannot continue into a function signature.
fn is_statement_line(line: &str) -> bool {
    let t = code_part(line).trim();
    t.starts_with('#') || t.ends_with(';') || t.ends_with('}')
}

fn is_comment_line(line: &str) -> bool {
    let t = line.trim();
    t.starts_with("//") || t.starts_with("/*") || t.starts_with('*') || t.ends_with("*/")
}

/// Part of the line before a `//` comment.
fn code_part(line: &str) -> &str {
    match line.find("//") {
        Some(i) => &line[..i],
        None => line,
    }
}

fn brace_delta(line: &str) -> i32 {
    code_part(line)
        .chars()
        .map(|c| match c {
            '{' => 1,
            '}' => -1,
            _ => 0,
        })
        .sum()
}

fn push_line(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}

fn join_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    for line in lines {
        push_line(&mut out, line);
    }
    out
}
