//! Recognized presentation options for a progressive image.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::errors::LoaderError;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("Invalid regex")
});

static FUNC_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:rgb|rgba|hsl|hsla)\(\s*[0-9.%\s,/+-]+\)$").expect("Invalid regex")
});

static NAMED_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]+$").expect("Invalid regex"));

static POSITION: LazyLock<Regex> = LazyLock::new(|| {
    let token = r"(?:left|right|top|bottom|center|[+-]?(?:\d+|\d*\.\d+)(?:%|px|r?em|ex|ch|vw|vh|vmin|vmax|cm|mm|in|pt|pc)?)";
    Regex::new(&format!(r"^{token}(?:\s+{token}){{0,3}}$")).expect("Invalid regex")
});

/// How the image box relates to its container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Layout {
    /// Exact intrinsic size, never resized.
    Fixed,
    /// Stretches to the container width, keeping aspect ratio.
    FullWidth,
    /// Shrinks with the container but never exceeds intrinsic width.
    #[default]
    Constrained,
}

impl FromStr for Layout {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "fullWidth" => Ok(Self::FullWidth),
            "constrained" => Ok(Self::Constrained),
            other => Err(LoaderError::invalid_options(format!(
                "unknown layout {other:?}, expected fixed, fullWidth or constrained"
            ))),
        }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::FullWidth => write!(f, "fullWidth"),
            Self::Constrained => write!(f, "constrained"),
        }
    }
}

/// CSS `object-fit` of the main and placeholder images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectFit {
    /// Fill the box, cropping overflow.
    #[default]
    Cover,
    /// Fit inside the box, letterboxing.
    Contain,
    /// Stretch to the box.
    Fill,
    /// Intrinsic size.
    None,
    /// Smaller of `none` and `contain`.
    ScaleDown,
}

impl ObjectFit {
    /// CSS keyword.
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Contain => "contain",
            Self::Fill => "fill",
            Self::None => "none",
            Self::ScaleDown => "scale-down",
        }
    }
}

/// When the main image fetch may start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loading {
    /// Wait for the container to become visible.
    #[default]
    Lazy,
    /// Start fetching on mount.
    Eager,
}

impl Loading {
    /// Value of the HTML `loading` attribute.
    #[must_use]
    pub const fn as_attr(self) -> &'static str {
        match self {
            Self::Lazy => "lazy",
            Self::Eager => "eager",
        }
    }
}

fn default_object_position() -> String {
    "50% 50%".to_string()
}

fn default_container_tag() -> String {
    "div".to_string()
}

/// Presentation options accepted by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOptions {
    /// Overrides the resource's own layout when set.
    #[serde(default)]
    pub layout: Option<Layout>,
    /// Fit of the image inside its box.
    #[serde(default)]
    pub object_fit: ObjectFit,
    /// Position of the image inside its box.
    #[serde(default = "default_object_position")]
    pub object_position: String,
    /// Colour painted behind the placeholder.
    #[serde(default)]
    pub background_color: Option<String>,
    /// Fetch timing.
    #[serde(default)]
    pub loading: Loading,
    /// Extra class appended to the wrapper.
    #[serde(default)]
    pub class_name: Option<String>,
    /// Tag of the wrapping element.
    #[serde(default = "default_container_tag")]
    pub container_tag: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            layout: None,
            object_fit: ObjectFit::default(),
            object_position: default_object_position(),
            background_color: None,
            loading: Loading::default(),
            class_name: None,
            container_tag: default_container_tag(),
        }
    }
}

impl ImageOptions {
    /// Starts a validated builder.
    #[must_use]
    pub fn builder() -> ImageOptionsBuilder {
        ImageOptionsBuilder::default()
    }

    /// Checks every option against its recognized values.
    ///
    /// # Errors
    /// Returns `LoaderError::InvalidOptions` naming the first bad option.
    pub fn validate(&self) -> Result<(), LoaderError> {
        if !POSITION.is_match(self.object_position.trim()) {
            return Err(LoaderError::invalid_options(format!(
                "objectPosition {:?} is not a CSS position",
                self.object_position
            )));
        }
        if let Some(color) = &self.background_color {
            if !is_css_color(color) {
                return Err(LoaderError::invalid_options(format!(
                    "backgroundColor {color:?} is not a CSS colour"
                )));
            }
        }
        if self.container_tag.is_empty()
            || !self.container_tag.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(LoaderError::invalid_options(format!(
                "container tag {:?} is not a valid element name",
                self.container_tag
            )));
        }
        Ok(())
    }

    /// Layout to use for a resource.
    #[must_use]
    pub fn effective_layout(&self, resource_layout: Layout) -> Layout {
        self.layout.unwrap_or(resource_layout)
    }
}

/// Builder producing validated `ImageOptions`.
#[derive(Debug, Default)]
pub struct ImageOptionsBuilder {
    options: ImageOptions,
}

impl ImageOptionsBuilder {
    /// Sets the layout override.
    #[must_use]
    pub const fn layout(mut self, layout: Layout) -> Self {
        self.options.layout = Some(layout);
        self
    }

    /// Sets `object-fit`.
    #[must_use]
    pub const fn object_fit(mut self, fit: ObjectFit) -> Self {
        self.options.object_fit = fit;
        self
    }

    /// Sets `object-position`.
    #[must_use]
    pub fn object_position(mut self, position: impl Into<String>) -> Self {
        self.options.object_position = position.into();
        self
    }

    /// Sets the background colour.
    #[must_use]
    pub fn background_color(mut self, color: impl Into<String>) -> Self {
        self.options.background_color = Some(color.into());
        self
    }

    /// Sets fetch timing.
    #[must_use]
    pub const fn loading(mut self, loading: Loading) -> Self {
        self.options.loading = loading;
        self
    }

    /// Sets the extra wrapper class.
    #[must_use]
    pub fn class_name(mut self, class: impl Into<String>) -> Self {
        self.options.class_name = Some(class.into());
        self
    }

    /// Sets the wrapper tag.
    #[must_use]
    pub fn container_tag(mut self, tag: impl Into<String>) -> Self {
        self.options.container_tag = tag.into();
        self
    }

    /// Validates and returns the options.
    ///
    /// # Errors
    /// Returns `LoaderError::InvalidOptions` if any option is unrecognized.
    pub fn build(self) -> Result<ImageOptions, LoaderError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

fn is_css_color(value: &str) -> bool {
    let value = value.trim();
    HEX_COLOR.is_match(value) || FUNC_COLOR.is_match(value) || NAMED_COLOR.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_str() {
        assert_eq!("fixed".parse::<Layout>().ok(), Some(Layout::Fixed));
        assert_eq!("fullWidth".parse::<Layout>().ok(), Some(Layout::FullWidth));
        assert_eq!("constrained".parse::<Layout>().ok(), Some(Layout::Constrained));

        let err = "stretch".parse::<Layout>().unwrap_err();
        assert!(matches!(err, LoaderError::InvalidOptions { .. }));
    }

    #[test]
    fn test_defaults() {
        let options = ImageOptions::default();
        assert_eq!(options.object_fit, ObjectFit::Cover);
        assert_eq!(options.object_position, "50% 50%");
        assert_eq!(options.loading, Loading::Lazy);
        assert_eq!(options.container_tag, "div");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_accepts_colours() {
        for color in ["#fff", "#a0b1c2", "rgb(10, 20, 30)", "hsla(120, 50%, 50%, 0.3)", "teal"] {
            let built = ImageOptions::builder().background_color(color).build();
            assert!(built.is_ok(), "{color} should be accepted");
        }
    }

    #[test]
    fn test_builder_rejects_bad_colour() {
        let result = ImageOptions::builder()
            .background_color("#12345")
            .build();
        assert!(matches!(result, Err(LoaderError::InvalidOptions { .. })));

        let result = ImageOptions::builder()
            .background_color("url(evil)")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_empty_position_and_bad_tag() {
        assert!(ImageOptions::builder().object_position("  ").build().is_err());
        assert!(ImageOptions::builder().container_tag("di v").build().is_err());
        assert!(ImageOptions::builder().container_tag("section").build().is_ok());
    }

    #[test]
    fn test_object_position_accepts_keywords_and_lengths() {
        for position in ["center", "left top", "25% 75%", "right 10px bottom 2.5em", "-4px 0"] {
            let built = ImageOptions::builder().object_position(position).build();
            assert!(built.is_ok(), "{position} should be accepted");
        }
    }

    #[test]
    fn test_object_position_rejects_style_injection() {
        for position in [
            "0 0;position:fixed;background:url(evil)",
            "50% 50%; opacity: 0",
            "calc(1px)",
            "left top right bottom center",
        ] {
            let result = ImageOptions::builder().object_position(position).build();
            assert!(
                matches!(result, Err(LoaderError::InvalidOptions { .. })),
                "{position} should be rejected"
            );
        }
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r##"{"layout":"fullWidth","objectFit":"scale-down","backgroundColor":"#000","loading":"eager"}"##;
        let options: ImageOptions = serde_json::from_str(json).expect("valid options");
        assert_eq!(options.layout, Some(Layout::FullWidth));
        assert_eq!(options.object_fit, ObjectFit::ScaleDown);
        assert_eq!(options.loading, Loading::Eager);
        assert_eq!(options.object_position, "50% 50%");
        assert_eq!(options.effective_layout(Layout::Fixed), Layout::FullWidth);
    }
}
