//! Purpose: Interpret a marker calibration token stream into flat, transposed arrays.
//! Exports: `MarkerGeometry`, `LocationField`, `LoadOptions`, `LoadOutcome`,
//! `load_marker_geometry`, `load_marker_geometry_with`, `parse_marker_geometry`.
//! Role: Two-phase loader; the scalar phase yields `Dims`, only `Dims` can start the array phase.
//! Invariants: No output buffer exists until both dimensions are known and positive.
//! Invariants: Output buffers are allocated fallibly; failure is `ErrorKind::Alloc`, never an abort.
//! Invariants: Location value `k` of angle row `j` lands at `location_index(k, j, num_angles)`.
//! Invariants: After each recognized field the cursor sits exactly past the value's subtree.
//! Notes: Non-array fields and rows are zero-filled and reported as notices, never fatal.
use std::alloc::{self, Layout};
use std::path::Path;

use bstr::ByteSlice;

use crate::core::cursor::{TokenCursor, key_eq};
use crate::core::error::{Error, ErrorKind};
use crate::core::layout::{Dims, location_index};
use crate::core::slurp::read_whole_file;
use crate::core::token::{Token, TokenKind};
use crate::core::tokenize::{DEFAULT_MAX_TOKENS, tokenize};
use crate::notice::{Notice, NoticeKind};

const NUM_ANGLES: &str = "num_angles";
const NUM_MARKERS: &str = "num_markers";
const ANGLES: &str = "angles";
const MARKER_COLOR: &str = "marker_color";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LoadOptions {
    pub max_tokens: usize,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LocationField {
    Start,
    Mid,
    End,
}

impl LocationField {
    pub const ALL: [LocationField; 3] = [LocationField::Start, LocationField::Mid, LocationField::End];

    pub fn key(self) -> &'static str {
        match self {
            LocationField::Start => "marker_start",
            LocationField::Mid => "marker_mid",
            LocationField::End => "marker_end",
        }
    }
}

/// Loaded calibration. Location arrays hold `2 * num_markers` coordinates per
/// angle, stored coordinate-major: `locations[k * num_angles + j]`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarkerGeometry {
    pub num_angles: usize,
    pub num_markers: usize,
    pub angles: Vec<i32>,
    pub marker_color: Vec<i32>,
    pub marker_start: Vec<i32>,
    pub marker_mid: Vec<i32>,
    pub marker_end: Vec<i32>,
}

impl MarkerGeometry {
    pub fn dims(&self) -> Dims {
        Dims {
            num_angles: self.num_angles,
            num_markers: self.num_markers,
        }
    }

    pub fn locations(&self, field: LocationField) -> &[i32] {
        match field {
            LocationField::Start => &self.marker_start,
            LocationField::Mid => &self.marker_mid,
            LocationField::End => &self.marker_end,
        }
    }

    /// `(x, y)` of `marker` at `angle`, or `None` when either index is out of range.
    pub fn point(&self, field: LocationField, marker: usize, angle: usize) -> Option<(i32, i32)> {
        let dims = self.dims();
        if marker >= dims.num_markers || angle >= dims.num_angles {
            return None;
        }
        let locations = self.locations(field);
        let x = locations[location_index(2 * marker, angle, dims.num_angles)];
        let y = locations[location_index(2 * marker + 1, angle, dims.num_angles)];
        Some((x, y))
    }

    fn locations_mut(&mut self, field: LocationField) -> &mut [i32] {
        match field {
            LocationField::Start => &mut self.marker_start,
            LocationField::Mid => &mut self.marker_mid,
            LocationField::End => &mut self.marker_end,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadOutcome {
    pub geometry: MarkerGeometry,
    pub notices: Vec<Notice>,
}

pub fn load_marker_geometry(path: impl AsRef<Path>) -> Result<LoadOutcome, Error> {
    load_marker_geometry_with(path, &LoadOptions::default())
}

pub fn load_marker_geometry_with(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<LoadOutcome, Error> {
    let path = path.as_ref();
    let bytes = read_whole_file(path)?;
    parse_marker_geometry(&bytes, options).map_err(|err| {
        if err.path().is_some() {
            err
        } else {
            err.with_path(path)
        }
    })
}

pub fn parse_marker_geometry(src: &[u8], options: &LoadOptions) -> Result<LoadOutcome, Error> {
    let tokens = tokenize(src, options.max_tokens)?;
    let dims = ScalarPhase::new(src, &tokens)?.run()?;
    tracing::debug!(
        num_angles = dims.num_angles,
        num_markers = dims.num_markers,
        "dimensions resolved"
    );
    let outcome = ArrayPhase::allocate(src, &tokens, dims)?.run()?;
    tracing::debug!(notices = outcome.notices.len(), "marker geometry loaded");
    Ok(outcome)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Field {
    NumAngles,
    NumMarkers,
    Angles,
    MarkerColor,
    Location(LocationField),
}

impl Field {
    const ALL: [Field; 7] = [
        Field::NumAngles,
        Field::NumMarkers,
        Field::Angles,
        Field::MarkerColor,
        Field::Location(LocationField::Start),
        Field::Location(LocationField::Mid),
        Field::Location(LocationField::End),
    ];

    fn key(self) -> &'static str {
        match self {
            Field::NumAngles => NUM_ANGLES,
            Field::NumMarkers => NUM_MARKERS,
            Field::Angles => ANGLES,
            Field::MarkerColor => MARKER_COLOR,
            Field::Location(field) => field.key(),
        }
    }

    fn lookup(src: &[u8], token: &Token) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| key_eq(src, token, field.key()))
    }
}

fn root_object(tokens: &[Token]) -> Result<&Token, Error> {
    match tokens.first() {
        Some(root) if root.kind == TokenKind::Object => Ok(root),
        Some(root) => Err(Error::new(ErrorKind::Schema)
            .with_message(format!(
                "top-level value must be an object, found {}",
                root.kind.as_str()
            ))
            .with_offset(root.start)),
        None => Err(Error::new(ErrorKind::Schema).with_message("document has no tokens")),
    }
}

/// First pass: finds `num_angles` and `num_markers` among the root pairs.
struct ScalarPhase<'a> {
    cursor: TokenCursor<'a>,
    pairs: usize,
    num_angles: Option<usize>,
    num_markers: Option<usize>,
}

impl<'a> ScalarPhase<'a> {
    fn new(src: &'a [u8], tokens: &'a [Token]) -> Result<Self, Error> {
        let root = root_object(tokens)?;
        let mut cursor = TokenCursor::new(src, tokens);
        cursor.advance();
        Ok(Self {
            cursor,
            pairs: root.size,
            num_angles: None,
            num_markers: None,
        })
    }

    fn run(mut self) -> Result<Dims, Error> {
        for _ in 0..self.pairs {
            if self.num_angles.is_some() && self.num_markers.is_some() {
                break;
            }
            let key = self.cursor.expect_next("object key")?;
            match Field::lookup(self.cursor.src(), key) {
                Some(Field::NumAngles) if self.num_angles.is_none() => {
                    self.num_angles = Some(self.dimension(NUM_ANGLES)?);
                }
                Some(Field::NumMarkers) if self.num_markers.is_none() => {
                    self.num_markers = Some(self.dimension(NUM_MARKERS)?);
                }
                _ => {
                    self.cursor.skip_subtree();
                }
            }
        }

        let (Some(num_angles), Some(num_markers)) = (self.num_angles, self.num_markers) else {
            let missing = match self.num_angles {
                None => NUM_ANGLES,
                Some(_) => NUM_MARKERS,
            };
            return Err(Error::new(ErrorKind::Dimension)
                .with_message(format!("missing `{missing}`"))
                .with_key(missing)
                .with_hint("Both `num_angles` and `num_markers` must be positive integers."));
        };
        Dims::new(num_angles, num_markers)
    }

    fn dimension(&mut self, key: &str) -> Result<usize, Error> {
        let offset = self.cursor.peek().map(|token| token.start);
        let value = self.cursor.next_int_or(key, ErrorKind::Dimension)?;
        usize::try_from(value).map_err(|_| {
            let err = Error::new(ErrorKind::Dimension)
                .with_message(format!("`{key}` must be positive, found {value}"))
                .with_key(key);
            match offset {
                Some(offset) => err.with_offset(offset),
                None => err,
            }
        })
    }
}

/// Second pass: owns the zeroed outputs and fills them field by field.
struct ArrayPhase<'a> {
    cursor: TokenCursor<'a>,
    pairs: usize,
    dims: Dims,
    geometry: MarkerGeometry,
    notices: Vec<Notice>,
}

impl<'a> ArrayPhase<'a> {
    fn allocate(src: &'a [u8], tokens: &'a [Token], dims: Dims) -> Result<Self, Error> {
        let root = root_object(tokens)?;
        let location_len = dims.location_len().ok_or_else(|| {
            Error::new(ErrorKind::Alloc).with_message("location array size overflows usize")
        })?;
        let geometry = MarkerGeometry {
            num_angles: dims.num_angles,
            num_markers: dims.num_markers,
            angles: zeroed(dims.num_angles, ANGLES)?,
            marker_color: zeroed(dims.num_markers, MARKER_COLOR)?,
            marker_start: zeroed(location_len, LocationField::Start.key())?,
            marker_mid: zeroed(location_len, LocationField::Mid.key())?,
            marker_end: zeroed(location_len, LocationField::End.key())?,
        };
        let mut cursor = TokenCursor::new(src, tokens);
        cursor.advance();
        Ok(Self {
            cursor,
            pairs: root.size,
            dims,
            geometry,
            notices: Vec::new(),
        })
    }

    fn run(mut self) -> Result<LoadOutcome, Error> {
        for _ in 0..self.pairs {
            let key = self.cursor.expect_next("object key")?;
            let value_index = self.cursor.position();
            let Some(field) = Field::lookup(self.cursor.src(), key) else {
                let name = key.text(self.cursor.src()).as_bstr().to_string();
                record(
                    &mut self.notices,
                    NoticeKind::UnexpectedKey,
                    &name,
                    key.start,
                    format!("skipped unexpected key `{name}`"),
                );
                self.cursor.skip_subtree();
                continue;
            };

            match field {
                Field::NumAngles | Field::NumMarkers => {
                    self.cursor.skip_subtree();
                }
                Field::Angles => read_list(
                    &mut self.cursor,
                    ANGLES,
                    NUM_ANGLES,
                    &mut self.geometry.angles,
                    &mut self.notices,
                )?,
                Field::MarkerColor => read_list(
                    &mut self.cursor,
                    MARKER_COLOR,
                    NUM_MARKERS,
                    &mut self.geometry.marker_color,
                    &mut self.notices,
                )?,
                Field::Location(which) => read_locations(
                    &mut self.cursor,
                    which.key(),
                    self.dims,
                    self.geometry.locations_mut(which),
                    &mut self.notices,
                )?,
            }
            self.cursor.check_consumed(value_index, field.key())?;
        }

        Ok(LoadOutcome {
            geometry: self.geometry,
            notices: self.notices,
        })
    }
}

/// Fallible zeroed allocation. Pages come from the allocator already zeroed,
/// so memory is only committed as fields are written.
fn zeroed(len: usize, key: &str) -> Result<Vec<i32>, Error> {
    let failed = || {
        Error::new(ErrorKind::Alloc)
            .with_message(format!("failed to allocate {len} values"))
            .with_key(key)
    };
    let layout = Layout::array::<i32>(len).map_err(|err| failed().with_source(err))?;
    if layout.size() == 0 {
        return Ok(Vec::new());
    }
    // SAFETY: `layout` has a non-zero size.
    let ptr = unsafe { alloc::alloc_zeroed(layout) };
    if ptr.is_null() {
        return Err(failed());
    }
    // SAFETY: `ptr` was allocated by the global allocator with the layout of
    // `[i32; len]`, and all-zero bytes are a valid `i32`.
    Ok(unsafe { Vec::from_raw_parts(ptr.cast::<i32>(), len, len) })
}

fn read_list(
    cursor: &mut TokenCursor<'_>,
    key: &str,
    governing: &str,
    out: &mut [i32],
    notices: &mut Vec<Notice>,
) -> Result<(), Error> {
    let Some(list) = array_or_skip(cursor, key, NoticeKind::NonArrayField, notices, key) else {
        return Ok(());
    };
    expect_len(list, out.len(), key, governing)?;
    for slot in out.iter_mut() {
        *slot = element(cursor, key)?;
    }
    Ok(())
}

fn read_locations(
    cursor: &mut TokenCursor<'_>,
    key: &str,
    dims: Dims,
    out: &mut [i32],
    notices: &mut Vec<Notice>,
) -> Result<(), Error> {
    let Some(rows) = array_or_skip(cursor, key, NoticeKind::NonArrayField, notices, key) else {
        return Ok(());
    };
    expect_len(rows, dims.num_angles, key, NUM_ANGLES)?;

    for angle in 0..dims.num_angles {
        let label = format!("{key}[{angle}]");
        let Some(row) = array_or_skip(cursor, key, NoticeKind::NonArrayRow, notices, &label) else {
            continue;
        };
        expect_len(row, dims.coords_per_angle(), &label, "num_markers * 2")?;
        for coord in 0..row.size {
            out[location_index(coord, angle, dims.num_angles)] = element(cursor, key)?;
        }
    }
    Ok(())
}

/// Enters the next value if it is an array; otherwise skips it and records a notice.
fn array_or_skip<'a>(
    cursor: &mut TokenCursor<'a>,
    key: &str,
    kind: NoticeKind,
    notices: &mut Vec<Notice>,
    label: &str,
) -> Option<&'a Token> {
    let token = cursor.peek()?;
    if token.kind == TokenKind::Array {
        return cursor.advance();
    }
    record(
        notices,
        kind,
        key,
        token.start,
        format!("{label} is {}, not an array; left zeroed", token.kind.as_str()),
    );
    cursor.skip_subtree();
    None
}

fn expect_len(token: &Token, expected: usize, label: &str, governing: &str) -> Result<(), Error> {
    if token.size == expected {
        return Ok(());
    }
    Err(Error::new(ErrorKind::Dimension)
        .with_message(format!(
            "{label} has {} entries, expected {expected} ({governing})",
            token.size
        ))
        .with_key(label)
        .with_offset(token.start))
}

fn element(cursor: &mut TokenCursor<'_>, key: &str) -> Result<i32, Error> {
    let offset = cursor.peek().map(|token| token.start).unwrap_or_default();
    let value = cursor.next_int(key)?;
    i32::try_from(value).map_err(|err| {
        Error::new(ErrorKind::Schema)
            .with_message(format!("value {value} does not fit in a 32-bit integer"))
            .with_key(key)
            .with_offset(offset)
            .with_source(err)
    })
}

fn record(notices: &mut Vec<Notice>, kind: NoticeKind, key: &str, offset: usize, message: String) {
    tracing::warn!(kind = kind.as_str(), key, offset, "{message}");
    notices.push(Notice {
        kind,
        key: key.to_string(),
        offset,
        message,
    });
}
