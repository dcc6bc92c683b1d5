//! Token emitter for JSON text.
//!
//! [`JsonWriter`] mirrors [`JsonReader`](crate::reader::JsonReader): the graph
//! serializer pushes structure into it one token at a time and it takes care
//! of separators, indentation, escaping and the JSON path of the value being
//! written.
//!
//! ```rust
//! use jsongraph::writer::JsonWriter;
//! use jsongraph::{Formatting, JsonValue};
//!
//! let mut writer = JsonWriter::new(Formatting::None, 2);
//! writer.write_start_object();
//! writer.write_property_name("name", true);
//! writer.write_value(&JsonValue::from("Ann \"A\""));
//! writer.write_end_object();
//! assert_eq!(writer.into_inner(), r#"{"name":"Ann \"A\""}"#);
//! ```

use crate::path::{self, ContainerKind, Frame};
use crate::settings::Formatting;
use crate::value::{JsonValue, Number};

/// Writes JSON tokens into a string buffer.
#[derive(Debug, Clone)]
pub struct JsonWriter {
    output: String,
    formatting: Formatting,
    indent: usize,
    frames: Vec<Frame>,
    has_items: Vec<bool>,
    pending_property: bool,
}

impl JsonWriter {
    #[must_use]
    pub fn new(formatting: Formatting, indent: usize) -> Self {
        JsonWriter {
            output: String::with_capacity(256),
            formatting,
            indent,
            frames: Vec::new(),
            has_items: Vec::new(),
            pending_property: false,
        }
    }

    /// Consumes the writer and returns the JSON text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.output
    }

    /// Number of open containers.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// JSON path of the value being written.
    #[must_use]
    pub fn path(&self) -> String {
        path::render(&self.frames)
    }

    /// JSON path the next value would get: `name` inside an object, the next
    /// index inside an array.
    #[must_use]
    pub fn next_path(&self, name: Option<&str>) -> String {
        let mut frames = self.frames.clone();
        if let Some(frame) = frames.last_mut() {
            match frame.kind {
                ContainerKind::Object => {
                    if let Some(name) = name {
                        frame.name = Some(name.to_string());
                    }
                }
                ContainerKind::Array => frame.advance(),
            }
        }
        path::render(&frames)
    }

    /// A property name was written and its value has not been written yet.
    #[must_use]
    pub fn awaiting_value(&self) -> bool {
        self.pending_property
    }

    pub fn write_start_object(&mut self) {
        self.before_value();
        self.output.push('{');
        self.frames.push(Frame::new(ContainerKind::Object));
        self.has_items.push(false);
    }

    pub fn write_end_object(&mut self) {
        self.close('}');
    }

    pub fn write_start_array(&mut self) {
        self.before_value();
        self.output.push('[');
        self.frames.push(Frame::new(ContainerKind::Array));
        self.has_items.push(false);
    }

    pub fn write_end_array(&mut self) {
        self.close(']');
    }

    /// Closes the innermost open container, whatever its kind.
    pub fn write_end(&mut self) {
        match self.frames.last().map(|frame| frame.kind) {
            Some(ContainerKind::Object) => self.write_end_object(),
            Some(ContainerKind::Array) => self.write_end_array(),
            None => {}
        }
    }

    /// Writes a property name. With `escape == false` the name is written verbatim
    /// between quotes, which is only valid for names that need no escaping.
    pub fn write_property_name(&mut self, name: &str, escape: bool) {
        if self.has_items.last().copied().unwrap_or(false) {
            self.output.push(',');
        }
        if let Some(has_items) = self.has_items.last_mut() {
            *has_items = true;
        }
        self.write_newline();
        if escape {
            self.write_string(name);
        } else {
            self.output.push('"');
            self.output.push_str(name);
            self.output.push('"');
        }
        self.output.push(':');
        if self.formatting == Formatting::Indented {
            self.output.push(' ');
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.name = Some(name.to_string());
        }
        self.pending_property = true;
    }

    pub fn write_null(&mut self) {
        self.before_value();
        self.output.push_str("null");
    }

    /// Writes a complete value, recursing into arrays and objects.
    pub fn write_value(&mut self, value: &JsonValue) {
        match value {
            JsonValue::Null => self.write_null(),
            JsonValue::Bool(b) => {
                self.before_value();
                self.output.push_str(if *b { "true" } else { "false" });
            }
            JsonValue::Number(n) => {
                self.before_value();
                self.write_number(n);
            }
            JsonValue::String(s) => {
                self.before_value();
                self.write_string(s);
            }
            JsonValue::Array(items) => {
                self.write_start_array();
                for item in items {
                    self.write_value(item);
                }
                self.write_end_array();
            }
            JsonValue::Object(members) => {
                self.write_start_object();
                for (name, member) in members.iter() {
                    self.write_property_name(name, true);
                    self.write_value(member);
                }
                self.write_end_object();
            }
        }
    }

    /// Leaves the writer valid after an abandoned node: a dangling property gets
    /// `null` and containers opened below `depth` are closed.
    pub fn recover(&mut self, depth: usize) {
        if self.pending_property {
            self.write_null();
        }
        while self.depth() > depth {
            self.write_end();
        }
    }

    fn before_value(&mut self) {
        if self.pending_property {
            self.pending_property = false;
            return;
        }
        let in_array = self.frames.last().map(|frame| frame.kind) == Some(ContainerKind::Array);
        if !in_array {
            return;
        }
        if self.has_items.last().copied().unwrap_or(false) {
            self.output.push(',');
        }
        if let Some(has_items) = self.has_items.last_mut() {
            *has_items = true;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.advance();
        }
        self.write_newline();
    }

    fn close(&mut self, bracket: char) {
        let had_items = self.has_items.pop().unwrap_or(false);
        self.frames.pop();
        if had_items {
            self.write_newline();
        }
        self.output.push(bracket);
    }

    fn write_newline(&mut self) {
        if self.formatting == Formatting::Indented {
            self.output.push('\n');
            for _ in 0..self.frames.len() * self.indent {
                self.output.push(' ');
            }
        }
    }

    fn write_number(&mut self, number: &Number) {
        match number {
            Number::Integer(i) => self.output.push_str(&i.to_string()),
            Number::BigInt(b) => self.output.push_str(&b.to_string()),
            Number::Float(f) if f.is_finite() => self.output.push_str(&format!("{f:?}")),
            Number::Float(f) => {
                self.output.push('"');
                self.output.push_str(&Number::Float(*f).to_string());
                self.output.push('"');
            }
        }
    }

    fn write_string(&mut self, s: &str) {
        self.output.push('"');
        for ch in s.chars() {
            match ch {
                '"' => self.output.push_str("\\\""),
                '\\' => self.output.push_str("\\\\"),
                '\n' => self.output.push_str("\\n"),
                '\r' => self.output.push_str("\\r"),
                '\t' => self.output.push_str("\\t"),
                '\u{0008}' => self.output.push_str("\\b"),
                '\u{000C}' => self.output.push_str("\\f"),
                c if (c as u32) < 0x20 => {
                    self.output.push_str(&format!("\\u{:04x}", c as u32));
                }
                _ => self.output.push(ch),
            }
        }
        self.output.push('"');
    }
}

/// True when `name` can be written between quotes without escaping.
#[must_use]
pub fn is_escape_free(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
