//! Editing surface and cursor-preserving insertion.
//!
//! ```text
//! raw text / ImageRef ──▶ ContentFragment ──▶ CursorInsertionEngine::insert
//!                                                   │
//!                           EditableSurface ◀───────┘  (split at cursor, or append)
//!                                 │
//!                                 └──▶ serialize() → "<p>…</p><img … />"
//! ```

pub mod engine;
pub mod fragment;
pub mod surface;

pub use engine::{CursorInsertionEngine, InsertionMode};
pub use fragment::{ContentFragment, ImageRef};
pub use surface::{
    serialize_blocks, Block, EditableSurface, ImageBlock, Position, Selection, Surface, SurfaceId,
};
