//! JSON path bookkeeping shared by the reader and the writer.

const SPECIAL: &[char] = &[
    '.', ' ', '\'', '/', '"', '[', ']', '(', ')', '\t', '\n', '\r', '\u{c}', '\u{8}', '\\',
    '\u{85}', '\u{2028}', '\u{2029}',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContainerKind {
    Object,
    Array,
}

/// One open container and the member currently being visited inside it.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub(crate) kind: ContainerKind,
    pub(crate) name: Option<String>,
    pub(crate) index: Option<usize>,
}

impl Frame {
    pub(crate) fn new(kind: ContainerKind) -> Self {
        Frame {
            kind,
            name: None,
            index: None,
        }
    }

    /// Moves to the next array slot.
    pub(crate) fn advance(&mut self) {
        if self.kind == ContainerKind::Array {
            self.index = Some(self.index.map_or(0, |i| i + 1));
        }
    }
}

/// Renders `a.b[0]['odd name']` style paths.
pub(crate) fn render(frames: &[Frame]) -> String {
    let mut out = String::new();
    for frame in frames {
        match frame.kind {
            ContainerKind::Object => {
                if let Some(name) = &frame.name {
                    if name.contains(SPECIAL) {
                        out.push_str("['");
                        out.push_str(name);
                        out.push_str("']");
                    } else {
                        if !out.is_empty() {
                            out.push('.');
                        }
                        out.push_str(name);
                    }
                }
            }
            ContainerKind::Array => {
                if let Some(index) = frame.index {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                }
            }
        }
    }
    out
}
