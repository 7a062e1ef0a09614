//! Purpose: Define the stable public Rust API boundary for markergeom.
//! Exports: Loader entry points, output types, tokenizer, and error types.
//! Role: Public, additive-only surface used by the CLI and library callers.
//! Invariants: Callers never need `core` paths for a normal load.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::geometry::{
    LoadOptions, LoadOutcome, LocationField, MarkerGeometry, load_marker_geometry,
    load_marker_geometry_with, parse_marker_geometry,
};
pub use crate::core::layout::{Dims, location_index};
pub use crate::core::slurp::read_whole_file;
pub use crate::core::token::{Token, TokenKind};
pub use crate::core::tokenize::{DEFAULT_MAX_TOKENS, tokenize};
pub use crate::notice::{Notice, NoticeKind, notice_json};
