//! Template System - LaTeX Through Jinja-style Templates
//!
//! Delimiters are chosen so they never collide with LaTeX:
//! `{% ... %}` blocks, `<< ... >>` values, `/* ... */` comments.

use chrono::{DateTime, Utc};
use minijinja::syntax::SyntaxConfig;
use minijinja::{path_loader, AutoEscape, Environment, ErrorKind, UndefinedBehavior, Value};
use serde_json::Map;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::filters::{format_date, latex_escape, markdown_to_latex};

/// Name the full resume data is bound to.
pub const RESUME_BINDING: &str = "resume";
/// Name the PDF timestamp is bound to.
pub const TIMESTAMP_BINDING: &str = "compilation_timestamp";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("template syntax error in {}: {detail}", location(.name, *.line))]
    Syntax {
        name: String,
        line: Option<usize>,
        detail: String,
    },

    #[error("error rendering {}: {detail}", location(.name, *.line))]
    Render {
        name: String,
        line: Option<usize>,
        detail: String,
    },

    #[error("invalid template configuration: {0}")]
    Config(String),
}

fn location(name: &str, line: Option<usize>) -> String {
    match line {
        Some(line) => format!("'{name}' line {line}"),
        None => format!("'{name}'"),
    }
}

impl TemplateError {
    fn from_engine(err: minijinja::Error, fallback_name: &str) -> Self {
        let name = err.name().unwrap_or(fallback_name).to_string();
        let line = err.line();
        let detail = match err.detail() {
            Some(detail) => format!("{}: {detail}", err.kind()),
            None => err.kind().to_string(),
        };
        match err.kind() {
            ErrorKind::SyntaxError | ErrorKind::BadEscape => Self::Syntax { name, line, detail },
            _ => Self::Render { name, line, detail },
        }
    }
}

/// PDF date-time string, e.g. `D:20240131120000+00'00'`.
pub fn pdf_timestamp(at: DateTime<Utc>) -> String {
    at.format("D:%Y%m%d%H%M%S+00'00'").to_string()
}

/// Identifier test for top-level shortcut names.
pub fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Build the render context: `resume`, `compilation_timestamp`, and every
/// identifier-shaped top-level key as its own name. Fixed names are never shadowed.
pub fn build_context(
    resume: &Map<String, serde_json::Value>,
    timestamp: &str,
) -> BTreeMap<String, Value> {
    let mut context = BTreeMap::new();

    for (key, value) in resume {
        if is_identifier(key) && key != RESUME_BINDING && key != TIMESTAMP_BINDING {
            context.insert(key.clone(), Value::from_serialize(value));
        } else {
            tracing::debug!(op = "templates::build_context", key = %key, "key reachable only through resume");
        }
    }

    context.insert(RESUME_BINDING.to_string(), Value::from_serialize(resume));
    context.insert(TIMESTAMP_BINDING.to_string(), Value::from(timestamp));
    context
}

fn syntax() -> Result<SyntaxConfig, TemplateError> {
    SyntaxConfig::builder()
        .block_delimiters("{%", "%}")
        .variable_delimiters("<<", ">>")
        .comment_delimiters("/*", "*/")
        .build()
        .map_err(|e| TemplateError::Config(e.to_string()))
}

/// Renders one template file; includes and `extends` resolve relative to
/// the template's own directory.
#[derive(Debug)]
pub struct TemplateRenderer {
    env: Environment<'static>,
    name: String,
    path: PathBuf,
}

impl TemplateRenderer {
    pub fn new(template_path: &Path) -> Result<Self, TemplateError> {
        if !template_path.is_file() {
            return Err(TemplateError::NotFound(template_path.to_path_buf()));
        }
        let name = template_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TemplateError::NotFound(template_path.to_path_buf()))?
            .to_string();
        let dir = match template_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut env = Environment::new();
        env.set_loader(path_loader(dir));
        env.set_syntax(syntax()?);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(UndefinedBehavior::SemiStrict);

        env.add_filter("latex_escape", latex_escape);
        env.add_filter("markdown_to_latex", markdown_to_latex);
        env.add_filter("format_date", format_date);

        Ok(Self {
            env,
            name,
            path: template_path.to_path_buf(),
        })
    }

    /// Render with an explicit timestamp.
    pub fn render_at(
        &self,
        resume: &Map<String, serde_json::Value>,
        timestamp: &str,
    ) -> Result<String, TemplateError> {
        let template = self.env.get_template(&self.name).map_err(|e| {
            if e.kind() == ErrorKind::TemplateNotFound {
                TemplateError::NotFound(self.path.clone())
            } else {
                TemplateError::from_engine(e, &self.name)
            }
        })?;

        let context = build_context(resume, timestamp);
        let rendered = template
            .render(&context)
            .map_err(|e| TemplateError::from_engine(e, &self.name))?;

        tracing::info!(
            op = "templates::render",
            template = %self.name,
            bytes = rendered.len(),
            "template rendered"
        );
        Ok(rendered)
    }

    pub fn render(&self, resume: &Map<String, serde_json::Value>) -> Result<String, TemplateError> {
        self.render_at(resume, &pdf_timestamp(Utc::now()))
    }
}

/// `render(template_path, resume_data) -> rendered_text`.
pub fn render(
    template_path: &Path,
    resume: &Map<String, serde_json::Value>,
) -> Result<String, TemplateError> {
    TemplateRenderer::new(template_path)?.render(resume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::fs;

    const STAMP: &str = "D:20240131120000+00'00'";

    fn data(value: serde_json::Value) -> Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn render_str(source: &str, resume: serde_json::Value) -> Result<String, TemplateError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.tex.j2");
        fs::write(&path, source).unwrap();
        TemplateRenderer::new(&path)?.render_at(&data(resume), STAMP)
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("name"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("work2"));
        assert!(!is_identifier("personal-statement"));
        assert!(!is_identifier("2fa"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("has space"));
    }

    #[test]
    fn test_pdf_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(pdf_timestamp(at), STAMP);
    }

    #[test]
    fn test_context_bindings() {
        let resume = data(json!({"name": "Ada", "personal-statement": "hi", "resume": "shadow"}));
        let ctx = build_context(&resume, STAMP);
        assert!(ctx.contains_key("name"));
        assert!(!ctx.contains_key("personal-statement"));
        assert_eq!(ctx[TIMESTAMP_BINDING].as_str(), Some(STAMP));
        // The fixed binding keeps the whole mapping.
        assert!(ctx[RESUME_BINDING].get_attr("name").is_ok());
        assert_eq!(ctx[RESUME_BINDING].get_attr("name").unwrap().as_str(), Some("Ada"));
    }

    #[test]
    fn test_latex_braces_do_not_collide() {
        let out = render_str(r"\section{<< name >>} {#1} 100\%", json!({"name": "Ada"})).unwrap();
        assert_eq!(out, r"\section{Ada} {#1} 100\%");
    }

    #[test]
    fn test_no_html_escaping() {
        let out = render_str("<< text >>", json!({"text": "<b> & \"q\""})).unwrap();
        assert_eq!(out, "<b> & \"q\"");
    }

    #[test]
    fn test_filters_registered() {
        let out = render_str(
            "<< company | latex_escape >>|<< start | format_date >>|<< note | markdown_to_latex >>",
            json!({"company": "AT&T", "start": "2024-01", "note": "[Site](http://x.com)"}),
        )
        .unwrap();
        assert_eq!(out, r"AT\&T|Jan 2024|\href{http://x.com}{Site}");
    }

    #[test]
    fn test_comments_and_blocks() {
        let source = "/* ignored */\\begin{itemize}\n{% for s in skills %}\n  \\item << s >>\n{% endfor %}\n\\end{itemize}\n";
        let out = render_str(source, json!({"skills": ["Rust", "LaTeX"]})).unwrap();
        assert_eq!(out, "\\begin{itemize}\n  \\item Rust\n  \\item LaTeX\n\\end{itemize}");
    }

    #[test]
    fn test_single_trailing_newline_dropped() {
        let out = render_str("a\nb\n", json!({})).unwrap();
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn test_optional_field_in_condition() {
        let source = "{% if contact.linkedin %}LI{% endif %}ok";
        let out = render_str(source, json!({"contact": {"email": "ada@example.org"}})).unwrap();
        assert_eq!(out, "ok");

        let out = render_str(source, json!({"contact": {"linkedin": "ada"}})).unwrap();
        assert_eq!(out, "LIok");
    }

    #[test]
    fn test_printing_missing_attribute_is_render_error() {
        let err = render_str("<< contact.linkedin >>", json!({"contact": {}})).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }), "got {err}");
    }

    #[test]
    fn test_timestamp_available() {
        let out = render_str("\\pdfinfo{/CreationDate (<< compilation_timestamp >>)}", json!({})).unwrap();
        assert_eq!(out, format!("\\pdfinfo{{/CreationDate ({STAMP})}}"));
    }

    #[test]
    fn test_hyphenated_key_through_resume() {
        let out = render_str(
            r#"<< resume["personal-statement"] >>"#,
            json!({"personal-statement": "Builder of engines"}),
        )
        .unwrap();
        assert_eq!(out, "Builder of engines");
    }

    #[test]
    fn test_hyphenated_key_as_shortcut_fails() {
        let err = render_str(
            "<< personal-statement >>",
            json!({"personal-statement": "Builder of engines"}),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }), "got {err}");
    }

    #[test]
    fn test_missing_key_is_render_error() {
        let err = render_str("<< nowhere >>", json!({"name": "Ada"})).unwrap_err();
        match err {
            TemplateError::Render { name, line, .. } => {
                assert_eq!(name, "resume.tex.j2");
                assert_eq!(line, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_filter_on_wrong_type_is_render_error() {
        let err = render_str("<< years | latex_escape >>", json!({"years": 12})).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn test_malformed_directive_is_syntax_error() {
        let err = render_str("line one\n{% for x in %}\n", json!({})).unwrap_err();
        match err {
            TemplateError::Syntax { line, .. } => assert_eq!(line, Some(2)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_template() {
        let err = TemplateRenderer::new(Path::new("/nope/resume.j2")).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));
    }

    #[test]
    fn test_inheritance_relative_to_template_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.j2"),
            "\\documentclass{article}\n{% block body %}{% endblock %}\n",
        )
        .unwrap();
        fs::write(dir.path().join("header.j2"), "% << name >>\n").unwrap();
        let child = dir.path().join("resume.j2");
        fs::write(
            &child,
            "{% extends \"base.j2\" %}\n{% block body %}\n{% include \"header.j2\" %}\n{% endblock %}\n",
        )
        .unwrap();

        let out = TemplateRenderer::new(&child)
            .unwrap()
            .render_at(&data(json!({"name": "Ada"})), STAMP)
            .unwrap();
        assert!(out.starts_with("\\documentclass{article}\n"));
        assert!(out.contains("% Ada"));
    }
}
