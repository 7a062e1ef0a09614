//! Purpose: Human-facing pretty printer for `inspect`/`check` payloads.
//! Exports: `render_pretty`.
//! Role: Used when stdout is a TTY or `--pretty` is set; compact output bypasses it.
//! Invariants: Output parses back to the input value; ANSI codes only when `use_color`.
//! Invariants: Location arrays print one storage row per line, `num_angles` values each.
use markergeom::api::LocationField;
use serde_json::{Map, Value};

pub(crate) fn render_pretty(value: &Value, use_color: bool) -> String {
    let mut renderer = Renderer {
        out: String::new(),
        use_color,
    };
    renderer.value(value, 0, usize::MAX);
    renderer.out
}

#[derive(Clone, Copy)]
enum Paint {
    Key,
    Text,
    Number,
    Literal,
}

impl Paint {
    fn sgr(self) -> &'static str {
        match self {
            Paint::Key => "1;34",
            Paint::Text => "32",
            Paint::Number => "36",
            Paint::Literal => "35",
        }
    }
}

struct Renderer {
    out: String,
    use_color: bool,
}

impl Renderer {
    /// `row` is how many leaf values share a line.
    fn value(&mut self, value: &Value, depth: usize, row: usize) {
        match value {
            Value::Object(map) => self.object(map, depth),
            Value::Array(items) if items.iter().all(is_leaf) => self.rows(items, depth, row),
            Value::Array(items) => self.nested(items, depth),
            leaf => self.leaf(leaf),
        }
    }

    fn object(&mut self, map: &Map<String, Value>, depth: usize) {
        if map.is_empty() {
            self.out.push_str("{}");
            return;
        }
        let width = row_width(map);
        self.out.push('{');
        for (idx, (key, value)) in map.iter().enumerate() {
            if idx > 0 {
                self.out.push(',');
            }
            self.newline(depth + 1);
            self.paint(Paint::Key, &Value::from(key.as_str()).to_string());
            self.out.push_str(": ");
            let row = if is_location_key(key) { width } else { usize::MAX };
            self.value(value, depth + 1, row);
        }
        self.newline(depth);
        self.out.push('}');
    }

    fn nested(&mut self, items: &[Value], depth: usize) {
        self.out.push('[');
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.out.push(',');
            }
            self.newline(depth + 1);
            self.value(item, depth + 1, usize::MAX);
        }
        self.newline(depth);
        self.out.push(']');
    }

    fn rows(&mut self, items: &[Value], depth: usize, row: usize) {
        self.out.push('[');
        if items.len() <= row {
            self.leaves(items);
        } else {
            for (idx, chunk) in items.chunks(row).enumerate() {
                if idx > 0 {
                    self.out.push(',');
                }
                self.newline(depth + 1);
                self.leaves(chunk);
            }
            self.newline(depth);
        }
        self.out.push(']');
    }

    fn leaves(&mut self, items: &[Value]) {
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.out.push_str(", ");
            }
            self.leaf(item);
        }
    }

    fn leaf(&mut self, value: &Value) {
        let paint = match value {
            Value::Number(_) => Paint::Number,
            Value::String(_) => Paint::Text,
            _ => Paint::Literal,
        };
        self.paint(paint, &value.to_string());
    }

    fn paint(&mut self, paint: Paint, text: &str) {
        if self.use_color {
            self.out.push_str(&format!("\u{1b}[{}m{text}\u{1b}[0m", paint.sgr()));
        } else {
            self.out.push_str(text);
        }
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        self.out.push_str(&"  ".repeat(depth));
    }
}

fn is_leaf(value: &Value) -> bool {
    !value.is_array() && !value.is_object()
}

fn is_location_key(key: &str) -> bool {
    LocationField::ALL.iter().any(|field| field.key() == key)
}

/// Values per storage row of a location array in this payload.
fn row_width(map: &Map<String, Value>) -> usize {
    map.get("num_angles")
        .and_then(Value::as_u64)
        .and_then(|width| usize::try_from(width).ok())
        .filter(|width| *width > 0)
        .unwrap_or(usize::MAX)
}
