//! Variable substitution for extra encoder arguments.

use std::collections::HashMap;
use std::path::Path;

/// Substitution context for `{name}` placeholders in encoder arguments.
///
/// # Example
///
/// ```
/// use glbrecode_basis::TemplateContext;
/// use std::path::Path;
///
/// let ctx = TemplateContext::new()
///     .with_files(
///         Path::new("/tmp/work/image_0_BV3.png"),
///         Path::new("/tmp/work/image_0_BV3.basis"),
///         Path::new("/tmp/work"),
///     )
///     .with_var("quality", "255");
///
/// assert_eq!(ctx.substitute("{filestem}.ktx2"), "image_0_BV3.ktx2");
/// assert_eq!(ctx.substitute("-q {quality}"), "-q 255");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    vars: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty template context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-image file variables.
    ///
    /// - `{input}`: the extracted image file
    /// - `{output}`: the file the encoder must write
    /// - `{workspace}`: the intermediate directory
    /// - `{filestem}`: input file name without extension
    pub fn with_files(mut self, input: &Path, output: &Path, workspace: &Path) -> Self {
        self.set("input", &input.display().to_string());
        self.set("output", &output.display().to_string());
        self.set("workspace", &workspace.display().to_string());
        if let Some(stem) = input.file_stem() {
            self.set("filestem", &stem.to_string_lossy());
        }
        self
    }

    /// Add image and buffer view indices as `{image}` and `{view}`.
    pub fn with_indices(mut self, image: usize, view: usize) -> Self {
        self.set("image", &image.to_string());
        self.set("view", &view.to_string());
        self
    }

    /// Add a custom variable.
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Set a variable.
    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    /// Get a variable value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// Substitute `{name}` placeholders; unknown names are left as is.
    pub fn substitute(&self, template: &str) -> String {
        let mut result = template.to_string();
        for (key, value) in &self.vars {
            result = result.replace(&format!("{{{}}}", key), value);
        }
        result
    }

    /// Substitute placeholders in a list of arguments.
    pub fn substitute_all(&self, templates: &[String]) -> Vec<String> {
        templates.iter().map(|t| self.substitute(t)).collect()
    }
}
