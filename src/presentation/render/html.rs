//! HTML serialization of render trees.

use std::fmt::Write;

use super::node::RenderNode;

const VOID_ELEMENTS: &[&str] = &["img", "source", "br", "hr", "input", "meta", "link"];

/// Serializes `node` and its children to an HTML string.
#[must_use]
pub fn to_html(node: &RenderNode) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &RenderNode, out: &mut String) {
    out.push('<');
    out.push_str(&node.tag);

    for (name, value) in &node.attrs {
        if value.is_empty() && name.starts_with("data-") {
            let _ = write!(out, " {name}");
        } else {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
    }

    if !node.style.is_empty() {
        let style = node
            .style
            .iter()
            .map(|(property, value)| format!("{property}:{value}"))
            .collect::<Vec<_>>()
            .join(";");
        let _ = write!(out, " style=\"{}\"", escape(&style));
    }

    out.push('>');

    if VOID_ELEMENTS.contains(&node.tag.as_str()) {
        return;
    }

    for child in &node.children {
        write_node(child, out);
    }

    let _ = write!(out, "</{}>", node.tag);
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_elements_have_no_closing_tag() {
        let node = RenderNode::new("picture")
            .child(RenderNode::new("source").attr("srcset", "/a.webp"))
            .child(RenderNode::new("img").attr("src", "/a.png"));
        assert_eq!(
            to_html(&node),
            r#"<picture><source srcset="/a.webp"><img src="/a.png"></picture>"#
        );
    }

    #[test]
    fn test_escapes_attributes_and_style() {
        let node = RenderNode::new("img")
            .attr("alt", r#"Tom & "Jerry" <3"#)
            .css("background-color", "rgb(0, 0, 0)");
        assert_eq!(
            to_html(&node),
            r#"<img alt="Tom &amp; &quot;Jerry&quot; &lt;3" style="background-color:rgb(0, 0, 0)">"#
        );
    }

    #[test]
    fn test_empty_data_attributes_are_bare() {
        let node = RenderNode::new("div")
            .attr("data-main-image", "")
            .attr("alt", "");
        assert_eq!(to_html(&node), r#"<div data-main-image alt=""></div>"#);
    }

    #[test]
    fn test_rendered_tree_serializes() {
        use crate::domain::entities::{ImageOptions, ImageResource, ImageSources, LoadState, LoadView};
        use crate::presentation::render::render;

        let resource = ImageResource::new(ImageSources::from_src("/a.png"), 10, 10);
        let html = to_html(&render(
            &resource,
            &ImageOptions::default(),
            LoadView {
                state: LoadState::Observing,
                was_cached: false,
                native_lazy: false,
            },
        ));

        assert!(html.starts_with("<div class=\"lazyreveal-wrapper lazyreveal-wrapper-constrained\""));
        assert!(html.contains("data-src=\"/a.png\""));
        assert!(html.contains("<noscript>"));
        assert!(html.ends_with("</noscript></div>"));
    }
}
