//! Maps a loader snapshot onto the wrapper, sizer, placeholder and main image.
//!
//! Everything here is a pure function of the resource, its options and the
//! current `LoadView`; no state is mutated.

use std::time::Duration;

use crate::domain::entities::{
    FallbackSource, ImageOptions, ImageResource, ImageSources, Layout, LoadState, LoadView,
    SourceCandidate,
};

use super::node::RenderNode;

/// Base class of the wrapping element.
pub const WRAPPER_CLASS: &str = "lazyreveal-wrapper";

/// Fade timings of the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealStyle {
    /// Fade-out of the placeholder.
    pub placeholder_fade: Duration,
    /// Fade-in of the main image.
    pub main_fade: Duration,
}

impl Default for RevealStyle {
    fn default() -> Self {
        Self {
            placeholder_fade: Duration::from_millis(500),
            main_fade: Duration::from_millis(250),
        }
    }
}

/// Renders with the default fade timings.
#[must_use]
pub fn render(resource: &ImageResource, options: &ImageOptions, view: LoadView) -> RenderNode {
    render_with(resource, options, view, &RevealStyle::default())
}

/// Renders the container and its children in paint order.
#[must_use]
pub fn render_with(
    resource: &ImageResource,
    options: &ImageOptions,
    view: LoadView,
    reveal: &RevealStyle,
) -> RenderNode {
    let layout = options.effective_layout(resource.layout);

    wrapper(resource, options, layout)
        .child_opt(sizer(resource, layout))
        .child(placeholder(resource, options, layout, view, reveal))
        .child(main_image(resource, options, view, reveal, view.sources_assigned()))
        .child(RenderNode::new("noscript").child(main_image(
            resource,
            options,
            LoadView {
                state: LoadState::Loaded,
                was_cached: true,
                native_lazy: false,
            },
            reveal,
            true,
        )))
}

fn wrapper(resource: &ImageResource, options: &ImageOptions, layout: Layout) -> RenderNode {
    let mut class = WRAPPER_CLASS.to_string();
    if layout == Layout::Constrained {
        class.push_str(&format!(" {WRAPPER_CLASS}-constrained"));
    }
    if let Some(extra) = &options.class_name {
        class.push(' ');
        class.push_str(extra);
    }

    let mut node = RenderNode::new(options.container_tag.clone())
        .attr("class", class)
        .attr("data-lazyreveal-wrapper", "")
        .css("position", "relative")
        .css("overflow", "hidden");

    node = match layout {
        Layout::Fixed => node
            .css("width", format!("{}px", resource.width))
            .css("height", format!("{}px", resource.height)),
        Layout::Constrained => node
            .css("display", "inline-block")
            .css("vertical-align", "top"),
        Layout::FullWidth => node,
    };

    match &options.background_color {
        Some(color) => node.css("background-color", color.clone()),
        None => node,
    }
}

/// Spacer reserving the image's box before anything loads.
fn sizer(resource: &ImageResource, layout: Layout) -> Option<RenderNode> {
    match layout {
        Layout::FullWidth => {
            let ratio = resource.aspect_ratio()?;
            Some(
                RenderNode::new("div")
                    .attr("aria-hidden", "true")
                    .css("padding-top", format!("{}%", ratio * 100.0)),
            )
        }
        Layout::Constrained => {
            let svg = format!(
                "data:image/svg+xml;charset=utf-8,%3Csvg height='{}' width='{}' \
                 xmlns='http://www.w3.org/2000/svg' version='1.1'%3E%3C/svg%3E",
                resource.height, resource.width
            );
            Some(
                RenderNode::new("div")
                    .css("max-width", format!("{}px", resource.width))
                    .css("display", "block")
                    .child(
                        RenderNode::new("img")
                            .attr("alt", "")
                            .attr("role", "presentation")
                            .attr("aria-hidden", "true")
                            .attr("src", svg)
                            .css("max-width", "100%")
                            .css("display", "block")
                            .css("position", "static"),
                    ),
            )
        }
        Layout::Fixed => None,
    }
}

fn image_fill(options: &ImageOptions) -> Vec<(String, String)> {
    [
        ("position", "absolute".to_string()),
        ("top", "0".to_string()),
        ("left", "0".to_string()),
        ("width", "100%".to_string()),
        ("height", "100%".to_string()),
        ("object-fit", options.object_fit.as_css().to_string()),
        ("object-position", options.object_position.clone()),
    ]
    .into_iter()
    .map(|(p, v)| (p.to_string(), v))
    .collect()
}

fn transition(fade: Duration, view: LoadView) -> Option<String> {
    (!view.was_cached).then(|| format!("opacity {}ms linear", fade.as_millis()))
}

fn placeholder(
    resource: &ImageResource,
    options: &ImageOptions,
    layout: Layout,
    view: LoadView,
    reveal: &RevealStyle,
) -> RenderNode {
    let opacity = if view.state.is_loaded() { "0" } else { "1" };
    let fill = image_fill(options);
    let fade = transition(reveal.placeholder_fade, view);
    let background = options.background_color.clone();
    let (width, height) = (resource.width, resource.height);

    let decorate = move |node: RenderNode| {
        let mut node = node
            .attr("aria-hidden", "true")
            .attr("data-placeholder-image", "")
            .css_all(fill)
            .css("opacity", opacity);

        if let Some(fade) = fade {
            node = node.css("transition", fade);
        }

        match background {
            Some(color) => {
                let node = node.css("background-color", color);
                match layout {
                    Layout::Fixed => node
                        .css("width", format!("{width}px"))
                        .css("height", format!("{height}px"))
                        .css("position", "relative"),
                    Layout::Constrained | Layout::FullWidth => {
                        node.css("bottom", "0").css("right", "0")
                    }
                }
            }
            None => node,
        }
    };

    let Some(placeholder) = resource.placeholder.as_ref() else {
        return decorate(RenderNode::new("div"));
    };
    let Some(fallback) = placeholder.fallback.as_ref() else {
        return decorate(RenderNode::new("div"));
    };

    let sources = ImageSources {
        fallback: Some(FallbackSource {
            src: fallback.clone(),
            src_set: None,
            sizes: None,
        }),
        sources: placeholder.sources.clone(),
    };
    picture(&sources, "", "lazy", true, decorate)
}

fn main_image(
    resource: &ImageResource,
    options: &ImageOptions,
    view: LoadView,
    reveal: &RevealStyle,
    assigned: bool,
) -> RenderNode {
    let opacity = if view.state.is_loaded() { "1" } else { "0" };
    let fill = image_fill(options);

    picture(
        &resource.images,
        &resource.alt,
        options.loading.as_attr(),
        assigned,
        move |img| {
            let img = img
                .attr("data-main-image", "")
                .css_all(fill)
                .css("opacity", opacity)
                .css("will-change", "opacity");
            match transition(reveal.main_fade, view) {
                Some(transition) => img.css("transition", transition),
                None => img,
            }
        },
    )
}

/// `<picture>` with one `<source>` per candidate, or a bare `<img>` when
/// there are none. Before `assigned`, URLs go to `data-` attributes so the
/// browser does not fetch them.
fn picture(
    sources: &ImageSources,
    alt: &str,
    loading: &str,
    assigned: bool,
    decorate: impl FnOnce(RenderNode) -> RenderNode,
) -> RenderNode {
    let (src_attr, srcset_attr) = if assigned {
        ("src", "srcset")
    } else {
        ("data-src", "data-srcset")
    };

    let fallback = sources.fallback.as_ref();
    let img = RenderNode::new("img")
        .attr("decoding", "async")
        .attr("loading", loading)
        .attr("alt", alt)
        .attr_opt("sizes", sources.sizes())
        .attr_opt(src_attr, fallback.map(|f| f.src.as_str()))
        .attr_opt(srcset_attr, fallback.and_then(|f| f.src_set.as_deref()));
    let img = decorate(img);

    if sources.sources.is_empty() {
        return img;
    }

    sources
        .sources
        .iter()
        .fold(RenderNode::new("picture"), |node, candidate| {
            node.child(source(candidate, srcset_attr, sources.sizes()))
        })
        .child(img)
}

fn source(candidate: &SourceCandidate, srcset_attr: &str, sizes: Option<&str>) -> RenderNode {
    RenderNode::new("source")
        .attr_opt("type", candidate.mime_type.as_deref())
        .attr_opt("media", candidate.media.as_deref())
        .attr(srcset_attr, candidate.src_set.clone())
        .attr_opt("sizes", candidate.sizes.as_deref().or(sizes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Loading, ObjectFit, Placeholder};
    use test_case::test_case;

    fn resource(layout: Layout) -> ImageResource {
        let images = ImageSources::from_src("/img/photo.jpg").with_source(SourceCandidate {
            src_set: "/img/photo-400.webp 400w, /img/photo-800.webp 800w".to_string(),
            media: None,
            mime_type: Some("image/webp".to_string()),
            sizes: None,
        });
        ImageResource::new(images, 800, 600)
            .with_layout(layout)
            .with_alt("A photo")
    }

    fn view(state: LoadState) -> LoadView {
        LoadView {
            state,
            ..LoadView::default()
        }
    }

    fn main_img(node: &RenderNode) -> &RenderNode {
        node.children
            .iter()
            .filter(|c| c.tag != "noscript")
            .find_map(|c| c.find(&|n| n.tag == "img" && n.has_attr("data-main-image")))
            .expect("main image present")
    }

    fn placeholder_node(node: &RenderNode) -> &RenderNode {
        node.find(&|n| n.has_attr("data-placeholder-image"))
            .expect("placeholder present")
    }

    #[test_case(Layout::Fixed, 3 ; "fixed has no sizer")]
    #[test_case(Layout::FullWidth, 4 ; "full width has padding sizer")]
    #[test_case(Layout::Constrained, 4 ; "constrained has svg sizer")]
    fn test_children_in_paint_order(layout: Layout, count: usize) {
        let tree = render(&resource(layout), &ImageOptions::default(), view(LoadState::Idle));
        assert_eq!(tree.children.len(), count);
        let tags: Vec<_> = tree.children.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags.last(), Some(&"noscript"));
        assert!(tree.children[count - 3].has_attr("data-placeholder-image"));
        assert_eq!(tree.children[count - 2].tag, "picture");
    }

    #[test_case(Layout::Fixed, Some("800px"), None ; "fixed sets explicit size")]
    #[test_case(Layout::Constrained, None, Some("inline-block") ; "constrained is inline block")]
    #[test_case(Layout::FullWidth, None, None ; "full width stretches")]
    fn test_wrapper_style(layout: Layout, width: Option<&str>, display: Option<&str>) {
        let tree = render(&resource(layout), &ImageOptions::default(), view(LoadState::Idle));
        assert_eq!(tree.tag, "div");
        assert_eq!(tree.get_style("position"), Some("relative"));
        assert_eq!(tree.get_style("overflow"), Some("hidden"));
        assert_eq!(tree.get_style("width"), width);
        assert_eq!(tree.get_style("display"), display);
    }

    #[test]
    fn test_full_width_sizer_padding() {
        let tree = render(
            &resource(Layout::FullWidth),
            &ImageOptions::default(),
            view(LoadState::Idle),
        );
        assert_eq!(tree.children[0].get_style("padding-top"), Some("75%"));
        assert_eq!(tree.children[0].get_attr("aria-hidden"), Some("true"));
    }

    #[test]
    fn test_constrained_sizer_svg() {
        let tree = render(
            &resource(Layout::Constrained),
            &ImageOptions::default(),
            view(LoadState::Idle),
        );
        let sizer = &tree.children[0];
        assert_eq!(sizer.get_style("max-width"), Some("800px"));
        let svg = sizer.children[0].get_attr("src").unwrap();
        assert!(svg.contains("height='600' width='800'"));
        assert!(
            tree.get_attr("class")
                .unwrap()
                .contains("lazyreveal-wrapper-constrained")
        );
    }

    #[test_case(LoadState::Idle, false ; "idle defers")]
    #[test_case(LoadState::Observing, false ; "observing defers")]
    #[test_case(LoadState::Loading, true ; "loading assigns")]
    #[test_case(LoadState::Loaded, true ; "loaded assigns")]
    fn test_sources_assigned_from_loading(state: LoadState, assigned: bool) {
        let tree = render(&resource(Layout::Constrained), &ImageOptions::default(), view(state));
        let img = main_img(&tree);

        assert_eq!(img.has_attr("src"), assigned);
        assert_eq!(img.has_attr("data-src"), !assigned);

        let picture = tree.children.iter().find(|c| c.tag == "picture").unwrap();
        let source = &picture.children[0];
        assert_eq!(source.tag, "source");
        assert_eq!(source.has_attr("srcset"), assigned);
        assert_eq!(source.get_attr("type"), Some("image/webp"));
    }

    #[test]
    fn test_noscript_always_has_sources() {
        let tree = render(&resource(Layout::Fixed), &ImageOptions::default(), view(LoadState::Idle));
        let noscript = tree.children.last().unwrap();
        let img = noscript.find(&|n| n.tag == "img").unwrap();
        assert_eq!(img.get_attr("src"), Some("/img/photo.jpg"));
    }

    #[test_case(LoadState::Loading, "1", "0" ; "placeholder visible while loading")]
    #[test_case(LoadState::Loaded, "0", "1" ; "main image visible when loaded")]
    fn test_opacity_by_state(state: LoadState, placeholder: &str, main: &str) {
        let tree = render(&resource(Layout::Constrained), &ImageOptions::default(), view(state));
        assert_eq!(placeholder_node(&tree).get_style("opacity"), Some(placeholder));
        assert_eq!(main_img(&tree).get_style("opacity"), Some(main));
        assert_eq!(
            placeholder_node(&tree).get_style("transition"),
            Some("opacity 500ms linear")
        );
        assert_eq!(main_img(&tree).get_style("transition"), Some("opacity 250ms linear"));
    }

    #[test]
    fn test_cached_view_skips_fade() {
        let cached = LoadView {
            state: LoadState::Loaded,
            was_cached: true,
            native_lazy: false,
        };
        let tree = render(&resource(Layout::Constrained), &ImageOptions::default(), cached);
        assert_eq!(placeholder_node(&tree).get_style("transition"), None);
        assert_eq!(main_img(&tree).get_style("transition"), None);
        assert_eq!(main_img(&tree).get_style("opacity"), Some("1"));
    }

    #[test]
    fn test_options_flow_into_styles() {
        let options = ImageOptions::builder()
            .object_fit(ObjectFit::Contain)
            .object_position("top left")
            .background_color("#eee")
            .loading(Loading::Eager)
            .class_name("hero")
            .container_tag("figure")
            .build()
            .unwrap();
        let tree = render(&resource(Layout::FullWidth), &options, view(LoadState::Idle));

        assert_eq!(tree.tag, "figure");
        assert_eq!(tree.get_attr("class"), Some("lazyreveal-wrapper hero"));
        assert_eq!(tree.get_style("background-color"), Some("#eee"));
        let img = main_img(&tree);
        assert_eq!(img.get_style("object-fit"), Some("contain"));
        assert_eq!(img.get_style("object-position"), Some("top left"));
        assert_eq!(img.get_attr("loading"), Some("eager"));
        assert_eq!(placeholder_node(&tree).get_style("background-color"), Some("#eee"));
        assert_eq!(placeholder_node(&tree).get_style("right"), Some("0"));
    }

    #[test]
    fn test_placeholder_image_is_always_loaded() {
        let resource = resource(Layout::Constrained).with_placeholder(Placeholder {
            fallback: Some("data:image/jpeg;base64,AAAA".to_string()),
            sources: Vec::new(),
        });
        let tree = render(&resource, &ImageOptions::default(), view(LoadState::Observing));
        let placeholder = placeholder_node(&tree);
        assert_eq!(placeholder.tag, "img");
        assert_eq!(placeholder.get_attr("src"), Some("data:image/jpeg;base64,AAAA"));
        assert_eq!(placeholder.get_attr("alt"), Some(""));
    }

    #[test]
    fn test_custom_fade_timings() {
        let reveal = RevealStyle {
            placeholder_fade: Duration::from_millis(800),
            main_fade: Duration::from_millis(100),
        };
        let tree = render_with(
            &resource(Layout::Fixed),
            &ImageOptions::default(),
            view(LoadState::Loading),
            &reveal,
        );
        assert_eq!(
            placeholder_node(&tree).get_style("transition"),
            Some("opacity 800ms linear")
        );
        assert_eq!(main_img(&tree).get_style("transition"), Some("opacity 100ms linear"));
    }

    #[test]
    fn test_placeholder_with_sources_styles_inner_img() {
        let resource = resource(Layout::FullWidth).with_placeholder(Placeholder {
            fallback: Some("data:image/jpeg;base64,AAAA".to_string()),
            sources: vec![SourceCandidate {
                src_set: "data:image/webp;base64,BBBB".to_string(),
                media: None,
                mime_type: Some("image/webp".to_string()),
                sizes: None,
            }],
        });
        let tree = render(&resource, &ImageOptions::default(), view(LoadState::Loaded));

        let picture = &tree.children[1];
        assert_eq!(picture.tag, "picture");
        assert!(!picture.has_attr("data-placeholder-image"));
        assert_eq!(picture.get_style("position"), None);

        let placeholder = placeholder_node(&tree);
        assert_eq!(placeholder.tag, "img");
        assert_eq!(placeholder.get_attr("aria-hidden"), Some("true"));
        assert_eq!(placeholder.get_style("position"), Some("absolute"));
        assert_eq!(placeholder.get_style("opacity"), Some("0"));
        assert_eq!(
            placeholder.get_style("transition"),
            Some("opacity 500ms linear")
        );
    }

    #[test]
    fn test_native_lazy_assigns_sources_while_observing() {
        let native = LoadView {
            state: LoadState::Observing,
            native_lazy: true,
            ..LoadView::default()
        };
        let tree = render(&resource(Layout::Constrained), &ImageOptions::default(), native);
        let img = main_img(&tree);

        assert_eq!(img.get_attr("src"), Some("/img/photo.jpg"));
        assert_eq!(img.get_attr("loading"), Some("lazy"));
        assert_eq!(img.get_style("opacity"), Some("0"));
    }
}
