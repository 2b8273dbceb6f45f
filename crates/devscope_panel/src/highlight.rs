//! Syntax highlighting for function sources
//!
//! Token rules are regex patterns applied per line; for overlapping matches the
//! earliest start wins, and among equal starts the earlier rule wins. The
//! highlighter only classifies text; colors belong to whoever renders it.
//!
//! Building the rule set compiles a dozen regexes, so the process shares one
//! instance through [`highlighter()`].

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

/// Token classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A keyword (function, const, return, etc.)
    Keyword,
    /// A string or template literal
    String,
    /// A line or block comment
    Comment,
    /// A number literal
    Number,
    /// A PascalCase type or constructor name
    Type,
    /// A called function name
    Function,
    /// An operator or arrow
    Operator,
    /// Anything not matched by a rule
    Plain,
}

/// A single token rule
#[derive(Clone)]
pub struct TokenRule {
    pattern: Regex,
    kind: TokenKind,
}

impl TokenRule {
    /// Try to create a rule, returning None if the pattern is invalid
    pub fn try_new(pattern: &str, kind: TokenKind) -> Option<Self> {
        match Regex::new(pattern) {
            Ok(pattern) => Some(Self { pattern, kind }),
            Err(err) => {
                warn!(%err, pattern, "highlight rule skipped");
                None
            }
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl std::fmt::Debug for TokenRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRule")
            .field("pattern", &self.pattern.as_str())
            .field("kind", &self.kind)
            .finish()
    }
}

/// A classified byte range within a line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind,
}

/// One source line with spans covering all of it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightedLine {
    pub text: String,
    pub spans: Vec<HighlightSpan>,
}

impl HighlightedLine {
    /// `(text, kind)` pieces in order.
    pub fn segments(&self) -> impl Iterator<Item = (&str, TokenKind)> + '_ {
        self.spans
            .iter()
            .map(|span| (&self.text[span.start..span.end], span.kind))
    }
}

/// Highlighter for JavaScript and TypeScript sources
#[derive(Debug)]
pub struct CodeHighlighter {
    rules: Vec<TokenRule>,
}

impl Default for CodeHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeHighlighter {
    pub fn new() -> Self {
        let rules = [
            // Comments first so their contents are not tokenized
            (r"//.*$", TokenKind::Comment),
            (r"/\*.*?\*/", TokenKind::Comment),
            (r#""(?:[^"\\]|\\.)*""#, TokenKind::String),
            (r"'(?:[^'\\]|\\.)*'", TokenKind::String),
            (r"`[^`]*`", TokenKind::String),
            (
                r"\b(async|await|break|case|catch|class|const|continue|default|delete|do|else|export|extends|false|finally|for|function|if|import|in|instanceof|let|new|null|of|return|switch|this|throw|true|try|typeof|undefined|var|void|while|yield)\b",
                TokenKind::Keyword,
            ),
            (r"\b[A-Z][a-zA-Z0-9_$]*\b", TokenKind::Type),
            (r"\b\d+(\.\d+)?([eE][+-]?\d+)?n?\b", TokenKind::Number),
            (r"\b0x[0-9a-fA-F_]+\b", TokenKind::Number),
            (r"[a-zA-Z_$][\w$]*\s*\(", TokenKind::Function),
            (r"=>|===|!==|==|!=|<=|>=|&&|\|\||\?\?|\.\.\.|[+\-*/%=<>!?:]", TokenKind::Operator),
        ]
        .into_iter()
        .filter_map(|(pattern, kind)| TokenRule::try_new(pattern, kind))
        .collect();

        Self { rules }
    }

    pub fn rules(&self) -> &[TokenRule] {
        &self.rules
    }

    /// Highlight `code`. An empty input yields one empty line.
    pub fn highlight(&self, code: &str) -> Vec<HighlightedLine> {
        if code.is_empty() {
            return vec![self.highlight_line("")];
        }
        code.lines().map(|line| self.highlight_line(line)).collect()
    }

    fn highlight_line(&self, line: &str) -> HighlightedLine {
        let mut matches: Vec<HighlightSpan> = Vec::new();
        for rule in &self.rules {
            for m in rule.pattern.find_iter(line) {
                let mut end = m.end();
                // Calls match up to the paren; only the name is the token
                if rule.kind == TokenKind::Function {
                    end = m.as_str().trim_end_matches('(').trim_end().len() + m.start();
                }
                if end > m.start() {
                    matches.push(HighlightSpan {
                        start: m.start(),
                        end,
                        kind: rule.kind,
                    });
                }
            }
        }
        // Stable: equal starts keep rule order
        matches.sort_by_key(|m| m.start);

        let mut spans = Vec::new();
        let mut pos = 0;
        for m in matches {
            if m.start < pos {
                continue;
            }
            if m.start > pos {
                spans.push(HighlightSpan {
                    start: pos,
                    end: m.start,
                    kind: TokenKind::Plain,
                });
            }
            spans.push(m);
            pos = m.end;
        }
        if pos < line.len() {
            spans.push(HighlightSpan {
                start: pos,
                end: line.len(),
                kind: TokenKind::Plain,
            });
        }

        HighlightedLine {
            text: line.to_string(),
            spans,
        }
    }
}

/// Process-wide highlighter, built on first use.
pub fn highlighter() -> &'static CodeHighlighter {
    static HIGHLIGHTER: OnceLock<CodeHighlighter> = OnceLock::new();
    HIGHLIGHTER.get_or_init(|| {
        let highlighter = CodeHighlighter::new();
        debug!(rules = highlighter.rules.len(), "code highlighter ready");
        highlighter
    })
}
