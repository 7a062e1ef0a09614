//! Purpose: Dimension pair and the angle-major to coordinate-major index mapping.
//! Exports: `Dims`, `location_index`.
//! Role: The one place the flattened location layout is defined.
//! Invariants: `location_index` is a bijection from `[0, A) x [0, 2M)` onto `[0, 2AM)`.
//! Invariants: `Dims` values are always positive; construction checks sizes for overflow.
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Dims {
    pub num_angles: usize,
    pub num_markers: usize,
}

impl Dims {
    pub fn new(num_angles: usize, num_markers: usize) -> Result<Self, Error> {
        if num_angles == 0 || num_markers == 0 {
            return Err(Error::new(ErrorKind::Dimension).with_message(format!(
                "dimensions must be positive (num_angles {num_angles}, num_markers {num_markers})"
            )));
        }
        let dims = Self {
            num_angles,
            num_markers,
        };
        dims.location_len().ok_or_else(|| {
            Error::new(ErrorKind::Alloc).with_message(format!(
                "location arrays for {num_angles} angles x {num_markers} markers overflow usize"
            ))
        })?;
        Ok(dims)
    }

    /// Interleaved x/y values per angle row.
    pub fn coords_per_angle(&self) -> usize {
        self.num_markers * 2
    }

    pub fn location_len(&self) -> Option<usize> {
        self.num_markers
            .checked_mul(2)?
            .checked_mul(self.num_angles)
    }
}

/// Flat index of coordinate `coord` observed at angle `angle`.
pub fn location_index(coord: usize, angle: usize, num_angles: usize) -> usize {
    coord * num_angles + angle
}
