//! Purpose: Render pretty JSON with optional ANSI colorization for CLI output.
//! Exports: colorize_json.
//! Role: Small, pure formatter used by the schema/apply/get emission paths.
//! Invariants: When color is disabled, output equals serde_json::to_string_pretty.
//! Invariants: ANSI escapes appear only when explicitly enabled.
use serde_json::{Map, Value};

#[derive(Clone, Copy)]
enum Tone {
    Key,
    Text,
    Number,
    Literal,
    Punct,
}

impl Tone {
    fn code(self) -> &'static str {
        match self {
            Tone::Key => "36",
            Tone::Text => "32",
            Tone::Number => "33",
            Tone::Literal => "35",
            Tone::Punct => "39",
        }
    }
}

struct Painter {
    use_color: bool,
    out: String,
}

pub fn colorize_json(value: &Value, use_color: bool) -> String {
    let mut painter = Painter {
        use_color,
        out: String::new(),
    };
    painter.value(value, 0);
    painter.out
}

impl Painter {
    fn value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null => self.paint("null", Tone::Literal),
            Value::Bool(flag) => self.paint(if *flag { "true" } else { "false" }, Tone::Literal),
            Value::Number(number) => self.paint(&number.to_string(), Tone::Number),
            Value::String(text) => self.paint(&quote(text), Tone::Text),
            Value::Array(items) => self.array(items, depth),
            Value::Object(map) => self.object(map, depth),
        }
    }

    fn array(&mut self, items: &[Value], depth: usize) {
        if items.is_empty() {
            self.paint("[]", Tone::Punct);
            return;
        }
        self.paint("[", Tone::Punct);
        for (index, item) in items.iter().enumerate() {
            self.line_break(depth + 1);
            self.value(item, depth + 1);
            if index + 1 < items.len() {
                self.paint(",", Tone::Punct);
            }
        }
        self.line_break(depth);
        self.paint("]", Tone::Punct);
    }

    fn object(&mut self, map: &Map<String, Value>, depth: usize) {
        if map.is_empty() {
            self.paint("{}", Tone::Punct);
            return;
        }
        self.paint("{", Tone::Punct);
        for (index, (key, value)) in map.iter().enumerate() {
            self.line_break(depth + 1);
            self.paint(&quote(key), Tone::Key);
            self.paint(":", Tone::Punct);
            self.out.push(' ');
            self.value(value, depth + 1);
            if index + 1 < map.len() {
                self.paint(",", Tone::Punct);
            }
        }
        self.line_break(depth);
        self.paint("}", Tone::Punct);
    }

    fn line_break(&mut self, depth: usize) {
        self.out.push('\n');
        self.out.push_str(&"  ".repeat(depth));
    }

    fn paint(&mut self, text: &str, tone: Tone) {
        if self.use_color {
            self.out.push_str("\u{1b}[");
            self.out.push_str(tone.code());
            self.out.push('m');
            self.out.push_str(text);
            self.out.push_str("\u{1b}[0m");
        } else {
            self.out.push_str(text);
        }
    }
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::colorize_json;
    use serde_json::json;

    #[test]
    fn plain_output_matches_pretty() {
        let value = json!({
            "generatedAt": "2026-01-01T00:00:00Z",
            "categories": [{"id": "quality", "options": []}],
            "flags": [1, true, null],
            "empty": {}
        });
        let plain = colorize_json(&value, false);
        let pretty = serde_json::to_string_pretty(&value).expect("pretty");
        assert_eq!(plain, pretty);
    }

    #[test]
    fn colored_output_tags_each_token_kind() {
        let value = json!({"layer_height":"0.2","n":1,"b":true,"z":null});
        let colored = colorize_json(&value, true);
        assert!(colored.contains("\u{1b}[36m\"layer_height\"\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[32m\"0.2\"\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[33m1\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[35mtrue\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[35mnull\u{1b}[0m"));
    }
}
