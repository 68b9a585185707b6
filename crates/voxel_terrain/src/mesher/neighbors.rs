//! Face-indexed neighbor lattices.
//!
//! A fixed array of six optional lattices indexed by `Face`, replacing six
//! positional parameters whose order is easy to get wrong.

use std::sync::Arc;

use crate::constants::FACE_COUNT;
use crate::types::{DensityLattice, Face};

/// Borrowed neighbor lattices for one extraction.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeighborSet<'a> {
  lattices: [Option<&'a DensityLattice>; FACE_COUNT],
}

impl<'a> NeighborSet<'a> {
  /// No neighbors: every boundary sample falls back to the outside sentinel.
  pub const fn empty() -> Self {
    Self {
      lattices: [None; FACE_COUNT],
    }
  }

  /// The same lattice on every face. Only meaningful for constant fields.
  pub fn uniform(lattice: &'a DensityLattice) -> Self {
    Self {
      lattices: [Some(lattice); FACE_COUNT],
    }
  }

  pub fn with(mut self, face: Face, lattice: &'a DensityLattice) -> Self {
    self.lattices[face.index()] = Some(lattice);
    self
  }

  pub fn set(&mut self, face: Face, lattice: Option<&'a DensityLattice>) {
    self.lattices[face.index()] = lattice;
  }

  #[inline]
  pub fn get(&self, face: Face) -> Option<&'a DensityLattice> {
    self.lattices[face.index()]
  }

  /// Bit `face.index()` set for every present face.
  pub fn present_mask(&self) -> u8 {
    Face::ALL
      .iter()
      .filter(|f| self.get(**f).is_some())
      .fold(0u8, |mask, f| mask | (1 << f.index()))
  }

  pub fn is_complete(&self) -> bool {
    self.lattices.iter().all(Option::is_some)
  }
}

/// Owned neighbor lattices carried by a mesh request to a worker.
#[derive(Clone, Debug, Default)]
pub struct NeighborLattices {
  lattices: [Option<Arc<DensityLattice>>; FACE_COUNT],
}

impl NeighborLattices {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, face: Face, lattice: Option<Arc<DensityLattice>>) {
    self.lattices[face.index()] = lattice;
  }

  pub fn get(&self, face: Face) -> Option<&Arc<DensityLattice>> {
    self.lattices[face.index()].as_ref()
  }

  pub fn present_mask(&self) -> u8 {
    self.as_set().present_mask()
  }

  /// Borrow as a `NeighborSet` for extraction.
  pub fn as_set(&self) -> NeighborSet<'_> {
    let mut set = NeighborSet::empty();
    for face in Face::ALL {
      set.set(face, self.lattices[face.index()].as_deref());
    }
    set
  }

  /// Give up the held lattices, in `Face` order.
  pub fn into_lattices(self) -> impl Iterator<Item = Arc<DensityLattice>> {
    self.lattices.into_iter().flatten()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::LatticeDims;

  #[test]
  fn test_empty_and_uniform() {
    let lattice = DensityLattice::zeroed(LatticeDims::cubic(2));
    assert_eq!(NeighborSet::empty().present_mask(), 0);
    assert!(!NeighborSet::empty().is_complete());
    let all = NeighborSet::uniform(&lattice);
    assert_eq!(all.present_mask(), 0b11_1111);
    assert!(all.is_complete());
  }

  #[test]
  fn test_faces_do_not_alias() {
    let a = DensityLattice::zeroed(LatticeDims::cubic(1));
    let b = DensityLattice::zeroed(LatticeDims::cubic(2));
    let set = NeighborSet::empty().with(Face::NegX, &a).with(Face::PosZ, &b);
    assert_eq!(set.get(Face::NegX).map(|l| l.dims()), Some(a.dims()));
    assert_eq!(set.get(Face::PosZ).map(|l| l.dims()), Some(b.dims()));
    assert!(set.get(Face::PosX).is_none());
    assert_eq!(
      set.present_mask(),
      (1 << Face::NegX.index()) | (1 << Face::PosZ.index())
    );
  }

  #[test]
  fn test_owned_borrows_as_set() {
    let mut owned = NeighborLattices::new();
    owned.set(
      Face::PosY,
      Some(Arc::new(DensityLattice::zeroed(LatticeDims::cubic(1)))),
    );
    let set = owned.as_set();
    assert!(set.get(Face::PosY).is_some());
    assert_eq!(owned.present_mask(), 1 << Face::PosY.index());
  }

  #[test]
  fn test_into_lattices_skips_missing_faces() {
    let lattice = Arc::new(DensityLattice::zeroed(LatticeDims::cubic(1)));
    let mut owned = NeighborLattices::new();
    owned.set(Face::NegY, Some(Arc::clone(&lattice)));
    owned.set(Face::PosX, Some(Arc::clone(&lattice)));
    assert_eq!(owned.into_lattices().count(), 2);
    assert_eq!(Arc::strong_count(&lattice), 1);
  }
}
