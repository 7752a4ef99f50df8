//! Cursor-preserving insertion of content fragments.
//!
//! With a valid cursor inside the surface the fragment replaces the
//! selection: the block under the cursor is split, the fragment's blocks go
//! between the halves, and the caret ends up right after the inserted
//! content.  Without one (no selection, or a selection that belongs to some
//! other surface) the fragment is appended at the end and the selection is
//! left alone.

use crate::config::EditorConfig;
use crate::editor::fragment::ContentFragment;
use crate::editor::surface::{Block, EditableSurface, ImageBlock, Position, Selection};

/// Where an insertion landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionMode {
    AtCursor,
    Appended,
    /// Empty fragment; nothing changed.
    Skipped,
}

pub struct CursorInsertionEngine {
    image_max_width_percent: u8,
}

impl Default for CursorInsertionEngine {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl CursorInsertionEngine {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            image_max_width_percent: config.image_max_width_percent.clamp(1, 100),
        }
    }

    /// Insert `fragment` into `surface` and return the serialized content.
    pub fn insert<S: EditableSurface + ?Sized>(
        &self,
        surface: &mut S,
        fragment: &ContentFragment,
    ) -> String {
        self.insert_with_mode(surface, fragment);
        surface.serialize()
    }

    /// Like [`insert`](Self::insert) but reports which path was taken.
    pub fn insert_with_mode<S: EditableSurface + ?Sized>(
        &self,
        surface: &mut S,
        fragment: &ContentFragment,
    ) -> InsertionMode {
        let new_blocks = self.blocks_for(fragment);
        if new_blocks.is_empty() {
            return InsertionMode::Skipped;
        }

        match surface.selection().filter(|sel| surface.contains(sel)) {
            Some(selection) => {
                insert_at_selection(surface, selection, new_blocks);
                InsertionMode::AtCursor
            }
            None => {
                let end = surface.blocks().len();
                log::debug!(
                    "insert: no cursor in surface, appending {} block(s)",
                    new_blocks.len()
                );
                surface.splice(end..end, new_blocks);
                InsertionMode::Appended
            }
        }
    }

    fn blocks_for(&self, fragment: &ContentFragment) -> Vec<Block> {
        match fragment {
            ContentFragment::Text(units) => units.iter().cloned().map(Block::Paragraph).collect(),
            ContentFragment::Image(image) => vec![Block::Image(ImageBlock {
                image: image.clone(),
                max_width_percent: self.image_max_width_percent,
            })],
        }
    }
}

fn insert_at_selection<S: EditableSurface + ?Sized>(
    surface: &mut S,
    selection: Selection,
    new_blocks: Vec<Block>,
) {
    let (start, end) = selection.ordered();
    let blocks = surface.blocks();

    let (range, prefix, suffix) = if blocks.is_empty() {
        (0..0, None, None)
    } else {
        (
            start.block..end.block + 1,
            blocks[start.block].head(start.offset),
            blocks[end.block].tail(end.offset),
        )
    };

    let first_new = start.block + usize::from(prefix.is_some());
    let last_new = first_new + new_blocks.len() - 1;
    let caret_offset = new_blocks.last().map(Block::end_offset).unwrap_or(0);

    let mut replacement = Vec::with_capacity(new_blocks.len() + 2);
    replacement.extend(prefix);
    replacement.extend(new_blocks);
    replacement.extend(suffix);

    surface.splice(range, replacement);

    let caret = Position::new(last_new, caret_offset);
    surface.set_selection(Some(Selection::collapsed(selection.surface, caret)));
}
