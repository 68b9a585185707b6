//! Priority classes for chunk generation order.
//!
//! Classified from the chunk offset `(dx, dy, dz)` relative to the viewer
//! chunk, first matching rule wins:
//!
//! ```text
//!   Immediate  |dx|+|dy|+|dz| <= 1
//!   Adjacent   (dy == 0 and max(|dx|,|dz|) <= 2) or manhattan <= 3
//!   Near       (dy == 0 and max(|dx|,|dz|) <= 4) or manhattan <= 5
//!   Medium     manhattan <= 7
//!   Far        otherwise
//! ```

use crate::types::ChunkCoord;

/// Lower class = higher priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityClass {
  Immediate = 0,
  Adjacent = 1,
  Near = 2,
  Medium = 3,
  Far = 4,
}

impl PriorityClass {
  pub const ALL: [PriorityClass; 5] = [
    PriorityClass::Immediate,
    PriorityClass::Adjacent,
    PriorityClass::Near,
    PriorityClass::Medium,
    PriorityClass::Far,
  ];

  /// Class of a chunk at offset `(dx, dy, dz)` from the viewer chunk.
  pub fn from_offset(dx: i32, dy: i32, dz: i32) -> Self {
    let manhattan = dx
      .unsigned_abs()
      .saturating_add(dy.unsigned_abs())
      .saturating_add(dz.unsigned_abs());
    let same_layer = dy == 0;
    let horizontal = dx.unsigned_abs().max(dz.unsigned_abs());

    if manhattan <= 1 {
      PriorityClass::Immediate
    } else if (same_layer && horizontal <= 2) || manhattan <= 3 {
      PriorityClass::Adjacent
    } else if (same_layer && horizontal <= 4) || manhattan <= 5 {
      PriorityClass::Near
    } else if manhattan <= 7 {
      PriorityClass::Medium
    } else {
      PriorityClass::Far
    }
  }

  /// Class of `chunk` seen from viewer chunk `viewer`.
  #[inline]
  pub fn classify(viewer: ChunkCoord, chunk: ChunkCoord) -> Self {
    let (dx, dy, dz) = viewer.delta(chunk);
    Self::from_offset(dx, dy, dz)
  }

  #[inline]
  pub const fn rank(self) -> u8 {
    self as u8
  }
}

#[cfg(test)]
#[path = "priority_test.rs"]
mod priority_test;
