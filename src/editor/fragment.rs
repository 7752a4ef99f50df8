//! Content fragments: normalized, ready-to-insert units of text or one image.

/// Reference to an image, usually a `data:` URI from the image generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub src: String,
    pub alt: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageRef {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: String::new(),
            width: None,
            height: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = alt.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// What one insertion puts into the surface.
///
/// Built fresh for every delivery; fragments are never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentFragment {
    /// Paragraph texts in document order, each trimmed and non-empty.
    Text(Vec<String>),
    Image(ImageRef),
}

impl ContentFragment {
    /// Split `raw` into paragraphs at blank lines.
    ///
    /// Lines inside one paragraph keep their single `\n` separators.  Lines
    /// holding only whitespace count as blank.
    ///
    /// ```
    /// use dictation_composer::editor::ContentFragment;
    ///
    /// let fragment = ContentFragment::from_text("A\n\n  B  \n\n\n");
    /// assert_eq!(fragment, ContentFragment::Text(vec!["A".into(), "B".into()]));
    /// ```
    pub fn from_text(raw: &str) -> Self {
        let mut units = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in raw.lines() {
            if line.trim().is_empty() {
                push_unit(&mut units, &current);
                current.clear();
            } else {
                current.push(line);
            }
        }
        push_unit(&mut units, &current);

        ContentFragment::Text(units)
    }

    pub fn image(image: ImageRef) -> Self {
        ContentFragment::Image(image)
    }

    /// `true` for a text fragment without any paragraph.
    pub fn is_empty(&self) -> bool {
        matches!(self, ContentFragment::Text(units) if units.is_empty())
    }
}

fn push_unit(units: &mut Vec<String>, lines: &[&str]) {
    let unit = lines.join("\n");
    let unit = unit.trim();
    if !unit.is_empty() {
        units.push(unit.to_string());
    }
}
