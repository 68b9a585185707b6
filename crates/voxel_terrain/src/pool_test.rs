use std::sync::Arc;

use super::*;

fn dims() -> LatticeDims {
  LatticeDims::new(4, 2)
}

#[test]
fn test_acquire_fresh_is_zeroed() {
  let pool = BufferPool::new(4);
  let lattice = pool.acquire_lattice(dims());
  assert_eq!(lattice.dims(), dims());
  assert_eq!(lattice.values().len(), 5 * 3 * 5);
  assert!(lattice.values().iter().all(|&v| v == 0.0));
  assert_eq!(pool.stats().misses, 1);
}

#[test]
fn test_reacquired_lattice_is_zeroed() {
  let pool = BufferPool::new(4);
  let mut lattice = pool.acquire_lattice(dims());
  lattice.values_mut().fill(7.5);
  lattice.set(0, 0, 0, f32::NAN);
  pool.release_lattice(lattice);

  let reused = pool.acquire_lattice(dims());
  assert!(reused.values().iter().all(|&v| v == 0.0));
  let stats = pool.stats();
  assert_eq!(stats.hits, 1);
  assert_eq!(stats.misses, 1);
  assert_eq!(stats.retained_lattices, 0);
}

#[test]
fn test_shelves_keyed_by_dims() {
  let pool = BufferPool::new(4);
  pool.release_lattice(DensityLattice::zeroed(LatticeDims::cubic(8)));
  let other = pool.acquire_lattice(dims());
  assert_eq!(other.dims(), dims());
  assert_eq!(pool.stats().misses, 1);
  assert_eq!(pool.stats().retained_lattices, 1);
}

#[test]
fn test_capacity_bounds_retention() {
  let pool = BufferPool::new(2);
  for _ in 0..5 {
    pool.release_lattice(DensityLattice::zeroed(dims()));
    pool.release_mesh(MeshBuffer::new());
  }
  let stats = pool.stats();
  assert_eq!(stats.retained_lattices, 2);
  assert_eq!(stats.retained_meshes, 2);
  assert_eq!(stats.dropped, 6);
}

#[test]
fn test_zero_capacity_retains_nothing() {
  let pool = BufferPool::new(0);
  pool.release_mesh(MeshBuffer::new());
  assert_eq!(pool.stats().retained_meshes, 0);
}

#[test]
fn test_reacquired_mesh_is_cleared_and_keeps_capacity() {
  let pool = BufferPool::new(4);
  let mut mesh = pool.acquire_mesh(0);
  for i in 0..100 {
    let f = i as f32;
    mesh.push_triangle([[f, 0.0, 0.0], [0.0, f, 0.0], [0.0, 0.0, f]]);
  }
  let capacity = mesh.capacity();
  pool.release_mesh(mesh);

  let reused = pool.acquire_mesh(16);
  assert!(reused.is_empty());
  assert!(reused.normals.is_empty());
  assert!(!reused.bounds.is_valid());
  assert_eq!(reused.capacity(), capacity);
}

#[test]
fn test_concurrent_acquire_release() {
  let pool = Arc::new(BufferPool::new(8));
  let handles: Vec<_> = (0..4)
    .map(|_| {
      let pool = Arc::clone(&pool);
      std::thread::spawn(move || {
        for _ in 0..200 {
          let mut lattice = pool.acquire_lattice(LatticeDims::new(4, 2));
          assert!(lattice.values().iter().all(|&v| v == 0.0));
          lattice.values_mut().fill(1.0);
          pool.release_lattice(lattice);
        }
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }
  let stats = pool.stats();
  assert_eq!(stats.hits + stats.misses, 800);
  assert!(stats.retained_lattices <= 8);
}

#[test]
fn test_acquire_mesh_reserves_min_capacity() {
  let pool = BufferPool::new(4);
  let mesh = pool.acquire_mesh(300);
  assert!(mesh.capacity() >= 300);
  assert!(mesh.normals.capacity() >= 300);
}

#[test]
fn test_shared_buffers_released_by_last_owner() {
  let pool = BufferPool::new(4);
  let lattice = Arc::new(pool.acquire_lattice(dims()));
  let held = Arc::clone(&lattice);
  assert!(!pool.release_shared_lattice(lattice));
  assert_eq!(pool.stats().retained_lattices, 0);
  assert!(pool.release_shared_lattice(held));
  assert_eq!(pool.stats().retained_lattices, 1);

  let mesh = Arc::new(pool.acquire_mesh(3));
  let renderer = Arc::clone(&mesh);
  assert!(!pool.release_shared_mesh(mesh));
  assert!(pool.release_shared_mesh(renderer));
  assert_eq!(pool.stats().retained_meshes, 1);
}
