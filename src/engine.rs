use crate::ast::Template;
use crate::error::{Result, TemplateError};
use crate::value::Value;
use crate::{json, parser, RenderOptions, Renderer};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// Renders with a shared cache of parsed templates, keyed by template text.
///
/// Safe to share across threads. Two threads missing on the same template
/// both parse it and the last insert wins; the entries are identical.
///
/// Without a capacity the cache keeps every distinct template until
/// [`Engine::clear`]. With one, a miss on a full cache empties it first.
#[derive(Default)]
pub struct Engine {
    options: RenderOptions,
    cache: DashMap<String, Arc<Template>>,
    capacity: Option<usize>,
}

impl Engine {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            cache: DashMap::new(),
            capacity: None,
        }
    }

    /// Caps the number of cached templates.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Parsed form of `template`, from the cache when present.
    pub fn compile(&self, template: &str) -> std::result::Result<Arc<Template>, TemplateError> {
        if let Some(hit) = self.cache.get(template) {
            trace!(len = template.len(), "template cache hit");
            return Ok(Arc::clone(hit.value()));
        }
        trace!(len = template.len(), "template cache miss");
        let parsed = Arc::new(parser::parse(template, self.options.max_depth)?);
        match self.capacity {
            Some(0) => return Ok(parsed),
            Some(capacity) if self.cache.len() >= capacity => {
                trace!(capacity, "template cache full, clearing");
                self.cache.clear();
            }
            _ => {}
        }
        self.cache.insert(template.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(template_len = template.len(), data_len = data.len()))]
    pub fn render(&self, template: &str, data: &str) -> Result<String> {
        let root = json::parse(data, self.options.allow_comments, self.options.max_depth)?;
        self.render_value(template, &root)
    }

    pub fn render_value(&self, template: &str, data: &Value) -> Result<String> {
        let nodes = self.compile(template)?;
        Ok(Renderer::new(data, self.options.max_depth).render(&nodes))
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}
