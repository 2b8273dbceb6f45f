//! Collapsible JSON outline.
//!
//! Rows are addressed by JSON Pointer paths (`""` for the root, `/todos/0`
//! for the first todo). Only the root follows the "expand by default"
//! setting; every nested container starts closed until toggled.

use devscope_core::display::{format_number, format_value_for_copy};
use devscope_core::SerializedValue;
use rustc_hash::FxHashMap;

use crate::highlight::{highlighter, HighlightedLine};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowKind {
    Primitive,
    Array,
    Object,
    Function,
}

/// One visible line of the outline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonRow {
    pub path: String,
    pub depth: usize,
    /// Key under the parent object; `None` for the root and array items.
    pub name: Option<String>,
    pub kind: RowKind,
    /// `Array[3]`, `{2}`, `ƒ increment`, or the primitive's text.
    pub summary: String,
    pub open: bool,
    /// Highlighted source of an open function.
    pub code: Option<Vec<HighlightedLine>>,
}

impl JsonRow {
    pub fn is_expandable(&self) -> bool {
        self.kind != RowKind::Primitive
    }

    /// The row as one line of text, without indentation or markers.
    pub fn label(&self) -> String {
        match (&self.name, self.kind) {
            (Some(name), RowKind::Object) => format!("{name} {}", self.summary),
            (None, RowKind::Object) => format!("Object {}", self.summary),
            (Some(name), _) => format!("{name}: {}", self.summary),
            (None, _) => self.summary.clone(),
        }
    }
}

/// Open/closed state of an outline.
#[derive(Clone, Debug)]
pub struct JsonTree {
    expand_by_default: bool,
    toggled: FxHashMap<String, bool>,
}

impl Default for JsonTree {
    fn default() -> Self {
        Self::new(true)
    }
}

impl JsonTree {
    pub fn new(expand_by_default: bool) -> Self {
        Self {
            expand_by_default,
            toggled: FxHashMap::default(),
        }
    }

    pub fn expand_by_default(&self) -> bool {
        self.expand_by_default
    }

    pub fn set_expand_by_default(&mut self, expand: bool) {
        self.expand_by_default = expand;
    }

    pub fn is_open(&self, path: &str) -> bool {
        match self.toggled.get(path) {
            Some(open) => *open,
            None => path.is_empty() && self.expand_by_default,
        }
    }

    pub fn set_open(&mut self, path: &str, open: bool) {
        self.toggled.insert(path.to_string(), open);
    }

    /// Flip `path`. Returns the new state.
    pub fn toggle(&mut self, path: &str) -> bool {
        let open = !self.is_open(path);
        self.set_open(path, open);
        open
    }

    /// Forget every toggle.
    pub fn reset(&mut self) {
        self.toggled.clear();
    }

    /// Visible rows of `value`, depth first.
    pub fn rows(&self, value: &SerializedValue) -> Vec<JsonRow> {
        let mut rows = Vec::new();
        self.collect(value, String::new(), None, 0, &mut rows);
        rows
    }

    fn collect(
        &self,
        value: &SerializedValue,
        path: String,
        name: Option<String>,
        depth: usize,
        rows: &mut Vec<JsonRow>,
    ) {
        let open = self.is_open(&path);
        let (kind, summary) = describe(value);
        let code = match value {
            SerializedValue::Function(func) if open => Some(highlighter().highlight(func.source())),
            _ => None,
        };

        rows.push(JsonRow {
            path: path.clone(),
            depth,
            name,
            kind,
            summary,
            open: open && kind != RowKind::Primitive,
            code,
        });

        if !open {
            return;
        }
        match value {
            SerializedValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    let child = format!("{path}/{i}");
                    self.collect(item, child, None, depth + 1, rows);
                }
            }
            SerializedValue::Object(entries) => {
                for (key, item) in entries {
                    let child = format!("{path}/{}", escape_segment(key));
                    self.collect(item, child, Some(key.clone()), depth + 1, rows);
                }
            }
            _ => {}
        }
    }

    /// Plain-text rendering: two spaces per level, `▾`/`▸` before
    /// containers and functions, highlighted source under open functions.
    pub fn render(&self, value: &SerializedValue) -> String {
        let mut out = String::new();
        for row in self.rows(value) {
            let indent = "  ".repeat(row.depth);
            let marker = match (row.is_expandable(), row.open) {
                (false, _) => "",
                (true, true) => "▾ ",
                (true, false) => "▸ ",
            };
            out.push_str(&format!("{indent}{marker}{}\n", row.label()));
            for line in row.code.iter().flatten() {
                out.push_str(&format!("{indent}    {}\n", line.text));
            }
        }
        out
    }

    /// Text a copy button on the row at `path` puts on the clipboard.
    pub fn copy_text(value: &SerializedValue, path: &str) -> Option<String> {
        resolve(value, path).map(format_value_for_copy)
    }
}

fn describe(value: &SerializedValue) -> (RowKind, String) {
    match value {
        SerializedValue::Array(items) => (RowKind::Array, format!("Array[{}]", items.len())),
        SerializedValue::Object(entries) => (RowKind::Object, format!("{{{}}}", entries.len())),
        SerializedValue::Function(func) => (RowKind::Function, format!("ƒ {}", func.display_name())),
        SerializedValue::String(s) => (RowKind::Primitive, format!("\"{s}\"")),
        SerializedValue::Number(n) => (RowKind::Primitive, format_number(*n)),
        SerializedValue::Bool(b) => (RowKind::Primitive, b.to_string()),
        SerializedValue::Null => (RowKind::Primitive, "null".to_string()),
    }
}

fn escape_segment(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Value at a JSON Pointer `path`.
pub fn resolve<'a>(value: &'a SerializedValue, path: &str) -> Option<&'a SerializedValue> {
    if path.is_empty() {
        return Some(value);
    }
    path.strip_prefix('/')?
        .split('/')
        .try_fold(value, |current, segment| match current {
            SerializedValue::Array(_) => segment.parse::<usize>().ok().and_then(|i| current.at(i)),
            SerializedValue::Object(_) => current.get(&unescape_segment(segment)),
            _ => None,
        })
}
