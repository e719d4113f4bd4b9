//! Output filename templates and collision handling.
//!
//! A template is literal text mixed with placeholders:
//!
//! | Placeholder | Expands to | Example |
//! |---|---|---|
//! | `{name}` | source file stem | `holiday` |
//! | `{suffix}` | ` - ` + suffix of the last named operation, or nothing | ` - Inverted` |
//! | `{ext}` | output extension with the dot | `.jpg` |
//! | `{format}` | output extension without the dot | `jpg` |
//! | `{date}` | local date, `YYYY-MM-DD` | `2024-03-09` |
//! | `{time}` | local time, `HH-MM-SS` | `14-05-59` |
//! | `{###}` | first free sequence number, zero-padded to the number of `#` | `007` |
//!
//! The default template `{name}{suffix}{ext}` gives `holiday - Inverted.png`.
//! If the rendered name does not end in an extension of the output format,
//! the canonical one is appended.
//!
//! Once a name is rendered, [`resolve_collision`] applies the batch's
//! [`CollisionPolicy`] against what is already on disk.

use crate::formats::OutputFormat;
use crate::types::CollisionPolicy;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

pub const DEFAULT_TEMPLATE: &str = "{name}{suffix}{ext}";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Name,
    Suffix,
    Ext,
    Format,
    Date,
    Time,
    Counter(usize),
}

fn tokenize(template: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        if open > 0 {
            tokens.push(Token::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| format!("unclosed '{{' in naming template '{template}'"))?;
        let field = &after[..close];
        tokens.push(match field {
            "name" => Token::Name,
            "suffix" => Token::Suffix,
            "ext" => Token::Ext,
            "format" => Token::Format,
            "date" => Token::Date,
            "time" => Token::Time,
            hashes if !hashes.is_empty() && hashes.chars().all(|c| c == '#') => {
                Token::Counter(hashes.len())
            }
            other => {
                return Err(format!(
                    "unknown placeholder '{{{other}}}' in naming template '{template}'"
                ));
            }
        });
        rest = &after[close + 1..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Literal(rest.to_string()));
    }
    Ok(tokens)
}

/// Check a template for unknown placeholders and unbalanced braces.
pub fn validate_template(template: &str) -> Result<(), String> {
    if template.trim().is_empty() {
        return Err("naming template must not be empty".to_string());
    }
    tokenize(template).map(|_| ())
}

/// Everything a template can refer to.
#[derive(Debug, Clone, Copy)]
pub struct NameParts<'a> {
    pub stem: &'a str,
    /// Suffix of the last named operation (`Grayscale`, `Inverted`).
    pub suffix: Option<&'a str>,
    pub format: OutputFormat,
    pub now: NaiveDateTime,
}

fn render_tokens(tokens: &[Token], parts: &NameParts<'_>, counter: u32) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Name => out.push_str(parts.stem),
            Token::Suffix => {
                if let Some(suffix) = parts.suffix {
                    out.push_str(" - ");
                    out.push_str(suffix);
                }
            }
            Token::Ext => {
                out.push('.');
                out.push_str(parts.format.extension());
            }
            Token::Format => out.push_str(parts.format.extension()),
            Token::Date => out.push_str(&parts.now.format("%Y-%m-%d").to_string()),
            Token::Time => out.push_str(&parts.now.format("%H-%M-%S").to_string()),
            Token::Counter(width) => {
                let width = *width;
                out.push_str(&format!("{counter:0width$}"));
            }
        }
    }
    out
}

fn finish(mut name: String, format: OutputFormat) -> String {
    name = name.replace(['/', '\\'], "_");
    let lower = name.to_ascii_lowercase();
    let has_ext = format
        .aliases()
        .iter()
        .any(|alias| lower.ends_with(&format!(".{alias}")));
    if !has_ext {
        name.push('.');
        name.push_str(format.extension());
    }
    name
}

/// Render a file name (no directory) from a template.
///
/// Sequence placeholders resolve to `1`; use [`output_candidate`] to pick
/// the first free number in a directory.
pub fn render(template: &str, parts: &NameParts<'_>) -> Result<String, String> {
    let tokens = tokenize(template)?;
    Ok(finish(render_tokens(&tokens, parts, 1), parts.format))
}

/// Render a template into a path inside `dir`.
///
/// Templates with a `{###}` placeholder take the first sequence number whose
/// file does not exist yet.
pub fn output_candidate(dir: &Path, template: &str, parts: &NameParts<'_>) -> Result<PathBuf, String> {
    let tokens = tokenize(template)?;
    let has_counter = tokens.iter().any(|t| matches!(t, Token::Counter(_)));
    if !has_counter {
        return Ok(dir.join(finish(render_tokens(&tokens, parts, 1), parts.format)));
    }
    let mut counter = 1;
    loop {
        let path = dir.join(finish(render_tokens(&tokens, parts, counter), parts.format));
        if !path.exists() {
            return Ok(path);
        }
        counter += 1;
    }
}

/// Where an output should go after applying the collision policy.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTarget {
    /// Nothing exists at this path.
    Fresh(PathBuf),
    /// An existing file will be replaced.
    Replace(PathBuf),
    /// An existing file blocks the output; do not write.
    Skip(PathBuf),
}

impl OutputTarget {
    pub fn path(&self) -> &Path {
        match self {
            OutputTarget::Fresh(p) | OutputTarget::Replace(p) | OutputTarget::Skip(p) => p,
        }
    }
}

/// `name.ext` → `name (n).ext`.
pub fn numbered(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem} ({n}).{}", ext.to_string_lossy()),
        None => format!("{stem} ({n})"),
    };
    path.with_file_name(name)
}

pub fn resolve_collision(candidate: PathBuf, policy: CollisionPolicy) -> OutputTarget {
    if !candidate.exists() {
        return OutputTarget::Fresh(candidate);
    }
    match policy {
        CollisionPolicy::Overwrite => OutputTarget::Replace(candidate),
        CollisionPolicy::Skip => OutputTarget::Skip(candidate),
        CollisionPolicy::AutoIncrement => {
            let mut n = 1;
            loop {
                let next = numbered(&candidate, n);
                if !next.exists() {
                    return OutputTarget::Fresh(next);
                }
                n += 1;
            }
        }
    }
}
