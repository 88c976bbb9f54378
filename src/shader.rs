//! Shader and transform configuration forwarded to the renderer.
//!
//! The collection never interprets these sources; it stores them verbatim
//! and hands them to whatever compiles and issues the draw call.

/// Identity transform: raw position straight to clip space.
pub const DEFAULT_TRANSFORM: &str =
    "vec4 transform(vec3 position) { return vec4(position, 1.0); }";

const DEFAULT_VERTEX: &str = "\
attribute vec3 position;
attribute vec4 color;
varying vec4 v_color;
void main() {
    v_color = color;
    gl_Position = transform(position);
}
";

const DEFAULT_FRAGMENT: &str = "\
varying vec4 v_color;
void main() {
    gl_FragColor = v_color;
}
";

/// Shader program sources plus the transform expression prepended to the
/// vertex stage.
///
/// The transform maps a raw position to a final render-space position. The
/// effective vertex source is [`vertex_source`], which is the transform
/// followed by the vertex program.
///
/// [`vertex_source`]: ShaderConfig::vertex_source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderConfig {
    transform: String,
    vertex: String,
    fragment: String,
}

impl ShaderConfig {
    /// Create a config with the default pass-through triangle program.
    pub fn new() -> Self {
        Self {
            transform: DEFAULT_TRANSFORM.to_string(),
            vertex: DEFAULT_VERTEX.to_string(),
            fragment: DEFAULT_FRAGMENT.to_string(),
        }
    }

    /// Set the transform expression.
    pub fn with_transform(mut self, transform: impl Into<String>) -> Self {
        self.transform = transform.into();
        self
    }

    /// Set the vertex program source.
    pub fn with_vertex(mut self, vertex: impl Into<String>) -> Self {
        self.vertex = vertex.into();
        self
    }

    /// Set the fragment program source.
    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = fragment.into();
        self
    }

    /// Get the transform expression.
    pub fn transform(&self) -> &str {
        &self.transform
    }

    /// Effective vertex source: the transform expression prepended to the
    /// vertex program.
    pub fn vertex_source(&self) -> String {
        format!("{}\n{}", self.transform, self.vertex)
    }

    /// Get the fragment program source.
    pub fn fragment_source(&self) -> &str {
        &self.fragment
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_source_prepends_transform() {
        let config = ShaderConfig::new()
            .with_transform("vec4 transform(vec3 p) { return u_mvp * vec4(p, 1.0); }")
            .with_vertex("void main() {}");

        let source = config.vertex_source();
        assert!(source.starts_with("vec4 transform"));
        assert!(source.ends_with("void main() {}"));
    }

    #[test]
    fn test_default_is_passthrough() {
        let config = ShaderConfig::default();
        assert_eq!(config.transform(), DEFAULT_TRANSFORM);
        assert!(config.vertex_source().contains("gl_Position = transform(position)"));
        assert!(config.fragment_source().contains("gl_FragColor"));
    }
}
