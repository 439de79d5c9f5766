use std::error::Error as _;
use tera::Tera;

/// Tera-backed template engine for node prompts.
///
/// Rendering is strict: a placeholder with no value and no `default` filter
/// is an error, never an empty string.
pub struct PromptEngine {
    tera: Tera,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    /// Create with inline templates (no filesystem).
    pub fn new() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        Self { tera }
    }

    /// Register a template from a string. Fails on syntax errors only;
    /// missing values surface at render time.
    pub fn add_template(&mut self, name: &str, content: &str) -> Result<(), String> {
        self.tera
            .add_raw_template(name, content)
            .map_err(|e| describe(&e))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|existing| existing == name)
    }

    /// Render a named template with the given context.
    pub fn render(&self, template_name: &str, context: &tera::Context) -> Result<String, String> {
        self.tera
            .render(template_name, context)
            .map_err(|e| describe(&e))
    }

    /// Render a one-off string template (not registered).
    pub fn render_string(&self, template: &str, context: &tera::Context) -> Result<String, String> {
        Tera::one_off(template, context, false).map_err(|e| describe(&e))
    }
}

/// Tera nests the useful detail ("Variable `x` not found") in the source
/// chain; flatten it into one line.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
