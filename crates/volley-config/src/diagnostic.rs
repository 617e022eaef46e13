// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridges Figment errors into miette diagnostics.
//!
//! Unknown keys get a source span when the offending file can be found and a
//! "did you mean?" hint ranked by Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive triggers this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a key suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One problem found while loading `volley.toml`.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("`{key}` is not a recognised setting")]
    #[diagnostic(code(volley::config::unknown_key), help("{}", unknown_key_hint(suggestion.as_deref(), valid_keys)))]
    UnknownKey {
        key: String,
        /// Closest valid key, if any is similar enough.
        suggestion: Option<String>,
        /// Comma-separated valid keys for the section.
        valid_keys: String,
        #[label("unknown setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type ({detail})")]
    #[diagnostic(code(volley::config::invalid_type), help("use a value of type {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` is required")]
    #[diagnostic(
        code(volley::config::missing_key),
        help("add `{key} = <value>` to your volley.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but is semantically invalid.
    #[error("invalid setting: {message}")]
    #[diagnostic(code(volley::config::validation))]
    Validation { message: String },

    #[error("could not load configuration: {0}")]
    #[diagnostic(code(volley::config::other))]
    Other(String),
}

fn unknown_key_hint(suggestion: Option<&str>, valid_keys: &str) -> String {
    let mut hint = String::new();
    if let Some(close) = suggestion {
        hint.push_str(&format!("did you mean `{close}`? "));
    }
    hint.push_str("expected one of: ");
    hint.push_str(valid_keys);
    hint
}

/// Splits a Figment error into one [`ConfigError`] per underlying problem.
///
/// `sources` pairs a display path with file contents and is only used to
/// attach spans to unknown keys.
pub fn into_config_errors(err: figment::Error, sources: &[(String, String)]) -> Vec<ConfigError> {
    err.into_iter().map(|e| classify(e, sources)).collect()
}

fn classify(error: figment::Error, sources: &[(String, String)]) -> ConfigError {
    use figment::error::Kind;

    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let (span, src) = locate(&error, field, sources).unzip();
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, *expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: field.to_string(),
        },
        Kind::InvalidType(found, wanted) => ConfigError::InvalidType {
            key: error.path.join("."),
            detail: format!("got {found}"),
            expected: wanted.clone(),
            span: None,
            src: None,
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

fn origin_file(error: &figment::Error) -> Option<String> {
    match error.metadata.as_ref()?.source.as_ref()? {
        figment::Source::File(path) => Some(path.display().to_string()),
        _ => None,
    }
}

fn locate(
    error: &figment::Error,
    field: &str,
    sources: &[(String, String)],
) -> Option<(SourceSpan, NamedSource<String>)> {
    // Inline strings carry no file metadata; fall back to the only source.
    let (name, text) = match origin_file(error) {
        Some(file) => sources.iter().find(|(name, _)| *name == file)?,
        None if sources.len() == 1 => &sources[0],
        None => return None,
    };

    let offset = find_key_offset(text, &error.path, field)?;
    Some((
        (offset, field.len()).into(),
        NamedSource::new(name, text.clone()),
    ))
}

/// Byte offset of `field` as a key in `content`, searched after the header of
/// the first table in `path`, or from the top for root keys.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        Some(table) => {
            let header = format!("[{table}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let rest = &line[indent..];
        let is_key = rest
            .strip_prefix(field)
            .and_then(|after| after.chars().next())
            .is_some_and(|c| c == '=' || c.is_whitespace());
        if is_key {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// Closest valid key scoring above [`SUGGESTION_THRESHOLD`].
pub fn suggest_key<S: AsRef<str>>(unknown: &str, valid_keys: &[S]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (key.as_ref(), strsim::jaro_winkler(unknown, key.as_ref())))
        .filter(|&(_, score)| score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_owned())
}

/// Writes each error to stderr with miette's graphical report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut report = String::new();
        match handler.render_report(&mut report, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{report}"),
            Err(_) => eprintln!("config: {error}"),
        }
    }
}
