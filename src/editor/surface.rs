//! The editable surface boundary and an in-memory block document.
//!
//! The insertion engine only ever talks to [`EditableSurface`]; [`Surface`]
//! is the implementation the composer uses.  A surface is a flat list of
//! [`Block`]s.  Selections name the surface they belong to, so a selection
//! made somewhere else (a prompt box, another document) is never mistaken for
//! a cursor inside this one.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::editor::fragment::ImageRef;

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// An image block, sized for inline display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlock {
    pub image: ImageRef,
    /// CSS `max-width` as a percentage of the surface width.
    pub max_width_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(String),
    Image(ImageBlock),
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(text.into())
    }

    /// Largest valid cursor offset inside this block.
    pub fn end_offset(&self) -> usize {
        match self {
            Block::Paragraph(text) => text.len(),
            Block::Image(_) => 1,
        }
    }

    pub fn is_valid_offset(&self, offset: usize) -> bool {
        match self {
            Block::Paragraph(text) => text.is_char_boundary(offset),
            Block::Image(_) => offset <= 1,
        }
    }

    /// The part of this block before `offset`, if any.
    pub(crate) fn head(&self, offset: usize) -> Option<Block> {
        match self {
            Block::Paragraph(text) if offset > 0 => {
                Some(Block::Paragraph(text[..offset].to_string()))
            }
            Block::Image(_) if offset >= 1 => Some(self.clone()),
            _ => None,
        }
    }

    /// The part of this block from `offset` on, if any.
    pub(crate) fn tail(&self, offset: usize) -> Option<Block> {
        match self {
            Block::Paragraph(text) if offset < text.len() => {
                Some(Block::Paragraph(text[offset..].to_string()))
            }
            Block::Image(_) if offset == 0 => Some(self.clone()),
            _ => None,
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Block::Paragraph(text) => {
                out.push_str("<p>");
                out.push_str(&escape_text(text));
                out.push_str("</p>");
            }
            Block::Image(img) => {
                out.push_str("<img src=\"");
                out.push_str(&escape_attr(&img.image.src));
                out.push_str("\" alt=\"");
                out.push_str(&escape_attr(&img.image.alt));
                out.push('"');
                if let Some(w) = img.image.width {
                    out.push_str(&format!(" width=\"{w}\""));
                }
                if let Some(h) = img.image.height {
                    out.push_str(&format!(" height=\"{h}\""));
                }
                out.push_str(&format!(
                    " style=\"max-width: {}%; height: auto;\" />",
                    img.max_width_percent
                ));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Positions and selections
// ---------------------------------------------------------------------------

/// Process-unique identity of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SurfaceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A cursor position: block index plus offset inside the block.
///
/// Paragraph offsets are byte offsets on a char boundary; image offsets are
/// 0 (before) or 1 (after).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub block: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub surface: SurfaceId,
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn collapsed(surface: SurfaceId, at: Position) -> Self {
        Self {
            surface,
            anchor: at,
            focus: at,
        }
    }

    pub fn range(surface: SurfaceId, anchor: Position, focus: Position) -> Self {
        Self {
            surface,
            anchor,
            focus,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// `(start, end)` in document order.
    pub fn ordered(&self) -> (Position, Position) {
        if self.anchor <= self.focus {
            (self.anchor, self.focus)
        } else {
            (self.focus, self.anchor)
        }
    }
}

// ---------------------------------------------------------------------------
// EditableSurface
// ---------------------------------------------------------------------------

/// What the insertion engine needs from a host surface.
pub trait EditableSurface {
    fn id(&self) -> SurfaceId;

    /// The host's current selection, wherever it is.  Read it fresh; never
    /// keep it across an `.await`.
    fn selection(&self) -> Option<Selection>;

    fn set_selection(&mut self, selection: Option<Selection>);

    fn blocks(&self) -> &[Block];

    /// Replace `range` of the block list with `replacement`.
    fn splice(&mut self, range: Range<usize>, replacement: Vec<Block>);

    fn serialize(&self) -> String;

    /// `true` when `selection` belongs to this surface and both ends point
    /// at existing content.
    fn contains(&self, selection: &Selection) -> bool {
        if selection.surface != self.id() {
            return false;
        }
        let blocks = self.blocks();
        let valid = |p: Position| match blocks.get(p.block) {
            Some(block) => block.is_valid_offset(p.offset),
            // An empty surface still has a caret at its very start.
            None => blocks.is_empty() && p == Position::new(0, 0),
        };
        valid(selection.anchor) && valid(selection.focus)
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// In-memory block document.
#[derive(Debug, Clone)]
pub struct Surface {
    id: SurfaceId,
    blocks: Vec<Block>,
    selection: Option<Selection>,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    pub fn new() -> Self {
        Self::with_blocks(Vec::new())
    }

    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            id: SurfaceId::next(),
            blocks,
            selection: None,
        }
    }

    /// Replace the whole content; the selection is cleared.
    pub fn set_blocks(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
        self.selection = None;
    }

    /// Put the caret at `block`/`offset` of this surface.
    pub fn place_cursor(&mut self, block: usize, offset: usize) {
        self.selection = Some(Selection::collapsed(self.id, Position::new(block, offset)));
    }

    /// Put the caret after the last block.
    pub fn place_cursor_at_end(&mut self) {
        let at = match self.blocks.last() {
            Some(last) => Position::new(self.blocks.len() - 1, last.end_offset()),
            None => Position::new(0, 0),
        };
        self.selection = Some(Selection::collapsed(self.id, at));
    }

    /// Select from `anchor` to `focus` inside this surface.
    pub fn select(&mut self, anchor: Position, focus: Position) {
        self.selection = Some(Selection::range(self.id, anchor, focus));
    }

    /// Focus moved elsewhere.
    pub fn blur(&mut self) {
        self.selection = None;
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl EditableSurface for Surface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn splice(&mut self, range: Range<usize>, replacement: Vec<Block>) {
        self.blocks.splice(range, replacement);
    }

    fn serialize(&self) -> String {
        serialize_blocks(&self.blocks)
    }
}

/// HTML for a block list: `<p>` per paragraph, `<img />` per image.
pub fn serialize_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        block.write_html(&mut out);
    }
    out
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;").replace('\'', "&#39;")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn image_block() -> Block {
        Block::Image(ImageBlock {
            image: ImageRef::new("cat.png").with_alt("a \"cat\""),
            max_width_percent: 100,
        })
    }

    #[test]
    fn serializes_paragraphs_with_escaping() {
        let surface = Surface::with_blocks(vec![
            Block::paragraph("Hello"),
            Block::paragraph("1 < 2 & 3 > 2"),
        ]);
        assert_eq!(
            surface.serialize(),
            "<p>Hello</p><p>1 &lt; 2 &amp; 3 &gt; 2</p>"
        );
    }

    #[test]
    fn serializes_images_constrained() {
        let html = serialize_blocks(&[image_block()]);
        assert_eq!(
            html,
            "<img src=\"cat.png\" alt=\"a &quot;cat&quot;\" \
             style=\"max-width: 100%; height: auto;\" />"
        );

        let sized = Block::Image(ImageBlock {
            image: ImageRef::new("x").with_size(512, 512),
            max_width_percent: 80,
        });
        let html = serialize_blocks(&[sized]);
        assert!(html.contains("width=\"512\" height=\"512\""));
        assert!(html.contains("max-width: 80%"));
    }

    #[test]
    fn surfaces_get_distinct_ids() {
        assert_ne!(Surface::new().id(), Surface::new().id());
    }

    #[test]
    fn contains_checks_owner_and_bounds() {
        let mut surface = Surface::with_blocks(vec![Block::paragraph("Hola"), image_block()]);
        let other = Surface::new();

        surface.place_cursor(0, 4);
        assert!(surface.contains(&surface.selection().unwrap()));

        surface.place_cursor(1, 1);
        assert!(surface.contains(&surface.selection().unwrap()));

        // Past the end of the paragraph.
        surface.place_cursor(0, 5);
        assert!(!surface.contains(&surface.selection().unwrap()));

        // Past the last block.
        surface.place_cursor(2, 0);
        assert!(!surface.contains(&surface.selection().unwrap()));

        let foreign = Selection::collapsed(other.id(), Position::new(0, 0));
        assert!(!surface.contains(&foreign));
    }

    #[test]
    fn contains_rejects_offsets_inside_a_character() {
        let mut surface = Surface::with_blocks(vec![Block::paragraph("año")]);
        // 'ñ' is two bytes long, starting at 1.
        surface.place_cursor(0, 2);
        assert!(!surface.contains(&surface.selection().unwrap()));
        surface.place_cursor(0, 3);
        assert!(surface.contains(&surface.selection().unwrap()));
    }

    #[test]
    fn empty_surface_accepts_origin_caret() {
        let mut surface = Surface::new();
        surface.place_cursor_at_end();
        assert_eq!(
            surface.selection().map(|s| s.focus),
            Some(Position::new(0, 0))
        );
        assert!(surface.contains(&surface.selection().unwrap()));
    }

    #[test]
    fn ordered_selection() {
        let id = Surface::new().id();
        let sel = Selection::range(id, Position::new(2, 1), Position::new(0, 3));
        assert_eq!(sel.ordered(), (Position::new(0, 3), Position::new(2, 1)));
        assert!(!sel.is_collapsed());
    }

    #[test]
    fn head_and_tail_split_paragraphs() {
        let block = Block::paragraph("HelloWorld");
        assert_eq!(block.head(5), Some(Block::paragraph("Hello")));
        assert_eq!(block.tail(5), Some(Block::paragraph("World")));
        assert_eq!(block.head(0), None);
        assert_eq!(block.tail(10), None);
    }

    #[test]
    fn head_and_tail_never_split_images() {
        let img = image_block();
        assert_eq!(img.head(0), None);
        assert_eq!(img.tail(0), Some(img.clone()));
        assert_eq!(img.head(1), Some(img.clone()));
        assert_eq!(img.tail(1), None);
    }

    #[test]
    fn set_blocks_clears_selection() {
        let mut surface = Surface::with_blocks(vec![Block::paragraph("a")]);
        surface.place_cursor(0, 1);
        surface.set_blocks(vec![Block::paragraph("b")]);
        assert!(surface.selection().is_none());
        assert!(!surface.is_empty());
    }
}
