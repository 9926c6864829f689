//! Renderer module
//!
//! Renders ResultSet to different output formats: jsonl, json, md, raw

use crate::core::model::{Kind, ResultItem, ResultSet};
use std::io::Write;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Json,
    Markdown,
    Raw,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(OutputFormat::Jsonl),
            "json" => Ok(OutputFormat::Json),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "raw" => Ok(OutputFormat::Raw),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Render configuration combining format and options
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl RenderConfig {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            pretty: false,
        }
    }

    pub fn with_pretty(format: OutputFormat, pretty: bool) -> Self {
        Self { format, pretty }
    }
}

/// Renderer for result sets
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            config: RenderConfig::new(format),
        }
    }

    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render a result set to a string
    pub fn render(&self, result_set: &ResultSet) -> String {
        match self.config.format {
            OutputFormat::Jsonl => self.render_jsonl(result_set),
            OutputFormat::Json => self.render_json(result_set),
            OutputFormat::Markdown => self.render_markdown(result_set),
            OutputFormat::Raw => self.render_raw(result_set),
        }
    }

    /// Render to a writer, newline-terminated
    pub fn render_to<W: Write>(&self, result_set: &ResultSet, mut writer: W) -> std::io::Result<()> {
        let output = self.render(result_set);
        writer.write_all(output.as_bytes())?;
        if !output.is_empty() && !output.ends_with('\n') {
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// One JSON object per line
    fn render_jsonl(&self, result_set: &ResultSet) -> String {
        result_set
            .items
            .iter()
            .filter_map(|item| {
                if self.config.pretty {
                    serde_json::to_string_pretty(item).ok()
                } else {
                    serde_json::to_string(item).ok()
                }
            })
            .collect::<Vec<_>>()
            .join(if self.config.pretty { "\n\n" } else { "\n" })
    }

    fn render_json(&self, result_set: &ResultSet) -> String {
        if self.config.pretty {
            serde_json::to_string_pretty(&result_set.items).unwrap_or_else(|_| "[]".to_string())
        } else {
            serde_json::to_string(&result_set.items).unwrap_or_else(|_| "[]".to_string())
        }
    }

    fn render_markdown(&self, result_set: &ResultSet) -> String {
        let mut output = String::new();

        let section = |kind: Kind| {
            result_set
                .items
                .iter()
                .filter(|i| i.kind == kind)
                .collect::<Vec<_>>()
        };

        let errors = section(Kind::Error);
        if !errors.is_empty() {
            output.push_str("## Errors\n\n");
            for item in errors {
                for error in &item.errors {
                    output.push_str(&format!("- **{}**: {}\n", error.code, error.message));
                }
            }
            output.push('\n');
        }

        for (kind, title) in [
            (Kind::Codebase, "Codebase"),
            (Kind::Directory, "Directories"),
            (Kind::File, "Files"),
            (Kind::Check, "Checks"),
        ] {
            let items = section(kind);
            if items.is_empty() {
                continue;
            }
            output.push_str(&format!("## {}\n\n", title));
            for item in items {
                self.render_item_md(&mut output, item);
            }
        }

        output
    }

    fn render_item_md(&self, output: &mut String, item: &ResultItem) {
        let name = item.path.as_deref().unwrap_or("(codebase)");
        output.push_str(&format!("### `{}`", name));
        if let Some(status) = item.status {
            let status = serde_json::to_value(status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            output.push_str(&format!(" ({})", status));
        }
        output.push('\n');

        if let Some(excerpt) = &item.excerpt {
            output.push('\n');
            output.push_str(excerpt);
            if !excerpt.ends_with('\n') {
                output.push('\n');
            }
        }

        if item.meta.truncated {
            output.push_str("\n> Content was truncated\n");
        }

        for error in &item.errors {
            output.push_str(&format!("\n- **{}**: {}\n", error.code, error.message));
        }

        output.push('\n');
    }

    /// Raw mode: excerpts only
    fn render_raw(&self, result_set: &ResultSet) -> String {
        result_set
            .items
            .iter()
            .filter_map(|item| item.excerpt.clone())
            .collect::<Vec<_>>()
            .join("\n---\n")
    }
}
