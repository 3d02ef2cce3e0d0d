//! Mindmap rendering: outline markup → self-contained HTML document.
//!
//! The document loads markmap (plus d3) from a CDN, turns the embedded
//! Markdown into a tree with `markmap.Transformer`, and draws it into a single
//! `<svg id="mindmap">` surface. Rendering is a pure string transformation:
//! same outline and policy in, byte-identical document out.
//!
//! ## Embedding
//!
//! The outline is placed inside a JavaScript template literal. Five
//! sequences are escaped on the way in, in this order:
//!
//! | Input | Embedded | Why |
//! |-------|----------|-----|
//! | `\`   | `\\`     | keeps the escapes below unambiguous |
//! | `` ` `` | ``\` `` | would end the literal |
//! | `${`  | `\${`    | would start an interpolation |
//! | `</`  | `<\/`    | `</script>` would end the script element |
//! | `<!--` | `<\!--` | with a later `<script`, the parser would stop looking for `</script>` |
//!
//! [`unescape_template_literal`] reverses this exactly.

use crate::outline::Outline;
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Version-pinned script references, in load order.
pub const ENGINE_SCRIPTS: [&str; 3] = [
    "https://cdn.jsdelivr.net/npm/d3@6.7.0",
    "https://cdn.jsdelivr.net/npm/markmap-view@0.14.3",
    "https://cdn.jsdelivr.net/npm/markmap-lib@0.14.3/dist/browser/index.min.js",
];

/// Element id of the drawing surface.
pub const SURFACE_ID: &str = "mindmap";

/// Fixed visual settings for rendered mindmaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderPolicy {
    /// Branch colours, indexed by node depth modulo the palette length.
    pub palette: &'static [&'static str],
    /// Maximum width of a node label, in pixels.
    pub max_width: u32,
    /// Horizontal padding inside a node, in pixels.
    pub padding_x: u32,
    /// Fit the whole tree into the surface after every change.
    pub auto_fit: bool,
    /// Depth expanded when the map first opens.
    pub initial_expand_level: u32,
    /// Expand/collapse animation length, in milliseconds.
    pub duration_ms: u32,
    pub surface_height_px: u32,
    pub background: &'static str,
    pub corner_radius_px: u32,
}

impl RenderPolicy {
    pub const STANDARD: RenderPolicy = RenderPolicy {
        palette: &["#2196f3", "#4caf50", "#ff9800", "#f44336"],
        max_width: 600,
        padding_x: 16,
        auto_fit: true,
        initial_expand_level: 2,
        duration_ms: 500,
        surface_height_px: 600,
        background: "#e5e5e5",
        corner_radius_px: 25,
    };

    /// Colour for a node at `depth`.
    pub fn color_for_depth(&self, depth: usize) -> &'static str {
        self.palette[depth % self.palette.len()]
    }

    /// markmap constructor options, except the colour function.
    fn markmap_options(&self) -> serde_json::Value {
        json!({
            "maxWidth": self.max_width,
            "paddingX": self.padding_x,
            "autoFit": self.auto_fit,
            "initialExpandLevel": self.initial_expand_level,
            "duration": self.duration_ms,
        })
    }
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// A rendered mindmap: a complete HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualDocument {
    html: String,
}

const LITERAL_OPEN: &str = "const markdown = `";

impl VisualDocument {
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }

    pub fn len(&self) -> usize {
        self.html.len()
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }

    /// The outline markup embedded in this document, un-escaped.
    pub fn embedded_outline(&self) -> Option<String> {
        let start = self.html.find(LITERAL_OPEN)? + LITERAL_OPEN.len();
        let rest = &self.html[start..];

        // The literal ends at the first backtick not consumed by an escape.
        let mut escaped = false;
        for (i, c) in rest.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '`' => return Some(unescape_template_literal(&rest[..i])),
                _ => {}
            }
        }
        None
    }
}

impl fmt::Display for VisualDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html)
    }
}

/// Escape `markup` for a JavaScript template literal inside a `<script>` block.
pub fn escape_template_literal(markup: &str) -> String {
    markup
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
        .replace("</", "<\\/")
        .replace("<!--", "<\\!--")
}

/// Inverse of [`escape_template_literal`].
pub fn unescape_template_literal(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Render `outline` into a mindmap page using `policy`.
pub fn render(outline: &Outline, policy: &RenderPolicy) -> VisualDocument {
    render_markup(outline.as_str(), policy)
}

/// [`render`] for raw markup.
pub fn render_markup(markup: &str, policy: &RenderPolicy) -> VisualDocument {
    let escaped = escape_template_literal(markup);
    let palette = json!(policy.palette);
    let options = policy.markmap_options();

    let scripts: String = ENGINE_SCRIPTS
        .iter()
        .map(|src| format!("    <script src=\"{src}\"></script>\n"))
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        #{id} {{
            width: 100%;
            height: {height}px;
            background-color: {background};
            border-radius: {radius}px;
        }}
    </style>
{scripts}</head>
<body>
    <svg id="{id}"></svg>
    <script>
        window.onload = () => {{
            {LITERAL_OPEN}{escaped}`;
            const palette = {palette};
            const transformer = new markmap.Transformer();
            const {{ root }} = transformer.transform(markdown);
            const options = Object.assign(
                {{ color: (node) => palette[node.depth % palette.length] }},
                {options}
            );
            const mm = new markmap.Markmap(document.querySelector('#{id}'), options);
            mm.setData(root);
            mm.fit();
        }};
    </script>
</body>
</html>
"#,
        id = SURFACE_ID,
        height = policy.surface_height_px,
        background = policy.background,
        radius = policy.corner_radius_px,
    );

    VisualDocument { html }
}
