//! Lightweight element tree produced by the presentation adapter.

/// One element of the rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderNode {
    /// Element name.
    pub tag: String,
    /// Attributes in insertion order, excluding `style`.
    pub attrs: Vec<(String, String)>,
    /// Inline style declarations in insertion order.
    pub style: Vec<(String, String)>,
    /// Child elements in paint order.
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    /// Creates an empty element.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            style: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Sets an attribute, replacing an earlier value.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Sets an attribute if `value` is present.
    #[must_use]
    pub fn attr_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    /// Sets a style declaration, replacing an earlier value.
    #[must_use]
    pub fn css(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        let property = property.into();
        let value = value.into();
        if let Some(existing) = self.style.iter_mut().find(|(p, _)| *p == property) {
            existing.1 = value;
        } else {
            self.style.push((property, value));
        }
        self
    }

    /// Appends several style declarations.
    #[must_use]
    pub fn css_all(self, declarations: Vec<(String, String)>) -> Self {
        declarations
            .into_iter()
            .fold(self, |node, (property, value)| node.css(property, value))
    }

    /// Appends a child.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Appends a child if present.
    #[must_use]
    pub fn child_opt(self, child: Option<Self>) -> Self {
        match child {
            Some(child) => self.child(child),
            None => self,
        }
    }

    fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self.attrs.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Looks up a style declaration.
    #[must_use]
    pub fn get_style(&self, property: &str) -> Option<&str> {
        self.style
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the attribute is present.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attr(name).is_some()
    }

    /// Depth-first search for the first node matching `predicate`.
    #[must_use]
    pub fn find(&self, predicate: &dyn Fn(&Self) -> bool) -> Option<&Self> {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(predicate))
    }

    /// Depth-first list of nodes matching `predicate`.
    #[must_use]
    pub fn find_all(&self, predicate: &dyn Fn(&Self) -> bool) -> Vec<&Self> {
        let mut found = Vec::new();
        self.collect(predicate, &mut found);
        found
    }

    fn collect<'a>(&'a self, predicate: &dyn Fn(&Self) -> bool, found: &mut Vec<&'a Self>) {
        if predicate(self) {
            found.push(self);
        }
        for child in &self.children {
            child.collect(predicate, found);
        }
    }
}
