//! qtml: a small tag-based template engine that renders JSON data.
//!
//! A template is ordinary text (usually HTML) with a handful of tags:
//!
//! - `{v:path}`: substitute a value. Paths use `.name` and `[inner]`
//!   segments, e.g. `{v:major[_m_][_i_][Name]}`.
//! - `{math: expr}`: evaluate arithmetic, comparison or logic.
//! - `{iif case="expr" true="..." false="..."}`: inline conditional.
//! - `<loop set="path" key="k" value="v"> ... </loop>`: iterate an array
//!   or object.
//! - `<if case="expr"> ... <elseif case="expr" /> ... <else /> ... </if>`.
//!
//! Data comes in as JSON text, optionally with `//` and `/* */` comments.
//!
//! Error policy:
//! - Malformed JSON or a malformed template fails the whole render.
//! - A path that does not resolve, or an expression that cannot be
//!   evaluated (division by zero, text in arithmetic, ...), renders as
//!   empty text and rendering continues.
//!
//! Each render call owns its data tree, node tree and scope stack; nothing
//! is shared between calls except through an explicit [`Engine`] cache.

pub mod ast;
pub mod engine;
pub mod error;
pub mod eval;
pub mod expr;
pub mod json;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{Node, Path, Segment, Template};
pub use engine::Engine;
pub use error::{Error, ExprError, JsonError, JsonErrorKind, Result, TemplateError, TemplateErrorKind};
pub use eval::Renderer;
pub use value::{Number, Value};

/// Depth limit shared by the JSON reader, template parser and expression
/// parser.
pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Accept `//` and `/* */` comments in the JSON data.
    pub allow_comments: bool,
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            allow_comments: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RenderOptions {
    pub fn with_allow_comments(mut self, allow_comments: bool) -> Self {
        self.allow_comments = allow_comments;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Render `template` against the JSON document `data`.
///
/// ```
/// let out = qtml::render("{v:eq} = {math: {v:eq}}", r#"{"eq": "((1+2)^3)/2"}"#, false).unwrap();
/// assert_eq!(out, "((1+2)^3)/2 = 13.5");
/// ```
pub fn render(template: &str, data: &str, allow_comments: bool) -> Result<String> {
    render_with_options(
        template,
        data,
        &RenderOptions::default().with_allow_comments(allow_comments),
    )
}

#[tracing::instrument(level = "debug", skip_all, fields(template_len = template.len(), data_len = data.len()))]
pub fn render_with_options(template: &str, data: &str, options: &RenderOptions) -> Result<String> {
    let root = json::parse(data, options.allow_comments, options.max_depth)?;
    let nodes = compile(template, options)?;
    Ok(render_template(&nodes, &root, options))
}

/// Parse a template once for reuse across documents.
pub fn compile(template: &str, options: &RenderOptions) -> Result<Template> {
    Ok(parser::parse(template, options.max_depth)?)
}

/// Parse JSON data once for reuse across templates.
pub fn parse_data(data: &str, options: &RenderOptions) -> Result<Value> {
    Ok(json::parse(data, options.allow_comments, options.max_depth)?)
}

pub fn render_template(template: &Template, data: &Value, options: &RenderOptions) -> String {
    Renderer::new(data, options.max_depth).render(template)
}

/// UTF-8 byte-string adapter around [`render`].
pub fn render_bytes(template: &[u8], data: &[u8], allow_comments: bool) -> Result<Vec<u8>> {
    let template =
        std::str::from_utf8(template).map_err(|e| Error::Encoding(format!("template: {e}")))?;
    let data = std::str::from_utf8(data).map_err(|e| Error::Encoding(format!("data: {e}")))?;
    render(template, data, allow_comments).map(String::into_bytes)
}

/// UTF-16 wide-string adapter around [`render`].
pub fn render_wide(template: &[u16], data: &[u16], allow_comments: bool) -> Result<Vec<u16>> {
    let template =
        String::from_utf16(template).map_err(|e| Error::Encoding(format!("template: {e}")))?;
    let data = String::from_utf16(data).map_err(|e| Error::Encoding(format!("data: {e}")))?;
    render(&template, &data, allow_comments).map(|out| out.encode_utf16().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    #[ctor::ctor]
    fn init_tests() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }

    #[test]
    fn plain_text_is_identity() {
        assert_eq!(render("no tags here", "{}", false).unwrap(), "no tags here");
    }

    #[test]
    fn byte_and_wide_adapters_agree() {
        let template = "{v:name}: {math: 2 * 21}";
        let data = r#"{"name": "Größe"}"#;
        let bytes = render_bytes(template.as_bytes(), data.as_bytes(), false).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "Größe: 42");

        let wide_template: Vec<u16> = template.encode_utf16().collect();
        let wide_data: Vec<u16> = data.encode_utf16().collect();
        let wide = render_wide(&wide_template, &wide_data, false).unwrap();
        assert_eq!(String::from_utf16(&wide).unwrap(), "Größe: 42");
    }

    #[test]
    fn adapters_reject_bad_encoding() {
        assert!(matches!(render_bytes(b"\xff", b"{}", false), Err(Error::Encoding(_))));
        assert!(matches!(render_wide(&[0xD800], &[], false), Err(Error::Encoding(_))));
    }

    #[test]
    fn compiled_template_is_reusable() {
        let options = RenderOptions::default();
        let template = compile("<loop set=\"xs\" value=\"x\">{v:x}</loop>", &options).unwrap();
        let a = parse_data(r#"{"xs": [1, 2]}"#, &options).unwrap();
        let b = parse_data(r#"{"xs": ["q"]}"#, &options).unwrap();
        assert_eq!(render_template(&template, &a, &options), "12");
        assert_eq!(render_template(&template, &b, &options), "q");
    }

    #[test]
    fn max_depth_applies_to_all_parsers() {
        let options = RenderOptions::default().with_max_depth(2);
        let err = render_with_options("x", "[[[1]]]", &options).unwrap_err();
        assert!(matches!(err, Error::Json(JsonError { kind: JsonErrorKind::TooDeep, .. })));

        let err = render_with_options(
            "<if case=\"1\"><if case=\"1\"><if case=\"1\">x</if></if></if>",
            "{}",
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Template(TemplateError { kind: TemplateErrorKind::TooDeep, .. })));

        assert_eq!(render_with_options("[{math: ((((1))))}]", "{}", &options).unwrap(), "[]");
    }
}
