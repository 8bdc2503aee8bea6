//! The renderable output unit: an HTML snippet plus its assets.

/// A rendered fragment of a page.
///
/// Carries the markup together with the javascript and css resources it
/// needs and the name of the javascript function that initializes it on the
/// client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    content: String,
    javascript: Vec<String>,
    css: Vec<String>,
    js_init_fn: Option<String>,
}

impl Fragment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn add_javascript(&mut self, resource: impl Into<String>) {
        self.javascript.push(resource.into());
    }

    pub fn add_css(&mut self, resource: impl Into<String>) {
        self.css.push(resource.into());
    }

    pub fn javascript(&self) -> &[String] {
        &self.javascript
    }

    pub fn css(&self) -> &[String] {
        &self.css
    }

    /// Set the client-side initializer.
    pub fn initialize_js(&mut self, function: impl Into<String>) {
        self.js_init_fn = Some(function.into());
    }

    pub fn js_init_fn(&self) -> Option<&str> {
        self.js_init_fn.as_deref()
    }

    /// A new fragment with the content wrapped in `prefix`/`suffix`,
    /// keeping all resources. Wrappers build on this so earlier wrappers'
    /// markup survives.
    #[must_use]
    pub fn wrapped(mut self, prefix: &str, suffix: &str) -> Self {
        self.content = format!("{}{}{}", prefix, self.content, suffix);
        self
    }

    /// Absorb another fragment's resources (not its content).
    pub fn absorb_resources(&mut self, other: &Fragment) {
        for js in &other.javascript {
            if !self.javascript.contains(js) {
                self.javascript.push(js.clone());
            }
        }
        for css in &other.css {
            if !self.css.contains(css) {
                self.css.push(css.clone());
            }
        }
    }
}

/// Set the default client-side shim on fragments that did not pick an
/// initializer of their own.
pub fn shim_block_js(fragment: &mut Fragment) {
    if fragment.js_init_fn().is_none() {
        fragment.initialize_js("BlockToModuleShim");
    }
}

/// Escape text for embedding in markup.
pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_keeps_resources() {
        let mut fragment = Fragment::new("<p>hi</p>");
        fragment.add_javascript("block.js");
        fragment.add_css("block.css");

        let wrapped = fragment.wrapped("<div>", "</div>");
        assert_eq!(wrapped.content(), "<div><p>hi</p></div>");
        assert_eq!(wrapped.javascript(), &["block.js".to_string()]);
        assert_eq!(wrapped.css(), &["block.css".to_string()]);
    }

    #[test]
    fn shim_only_applies_when_unset() {
        let mut fragment = Fragment::new("x");
        shim_block_js(&mut fragment);
        assert_eq!(fragment.js_init_fn(), Some("BlockToModuleShim"));

        let mut fragment = Fragment::new("x");
        fragment.initialize_js("VideoPlayer");
        shim_block_js(&mut fragment);
        assert_eq!(fragment.js_init_fn(), Some("VideoPlayer"));
    }

    #[test]
    fn absorb_resources_deduplicates() {
        let mut a = Fragment::new("a");
        a.add_javascript("shared.js");
        let mut b = Fragment::new("b");
        b.add_javascript("shared.js");
        b.add_javascript("extra.js");

        a.absorb_resources(&b);
        assert_eq!(a.javascript(), &["shared.js".to_string(), "extra.js".to_string()]);
    }

    #[test]
    fn escape_html_escapes_angle_brackets() {
        assert_eq!(escape_html("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
    }
}
