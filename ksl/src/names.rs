//! Program-scoped name pool.

use crate::error::{KslError, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::trace;

/// Name pool of a program.
///
/// Generated names follow the `prefix_n` pattern, with a monotonic counter per prefix, and never collide with a
/// name already taken (generated or explicit). Explicit names are reserved as-is and fail on collision.
#[derive(Debug, Default)]
pub struct NamePool {
  counters: FxHashMap<String, u32>,
  taken: FxHashSet<Arc<str>>,
}

impl NamePool {
  pub fn new() -> Self {
    Self::default()
  }

  /// Allocate a fresh name for the given prefix.
  pub fn next_name(&mut self, prefix: &str) -> Arc<str> {
    let counter = self.counters.entry(prefix.to_owned()).or_insert(0);

    loop {
      *counter += 1;
      let candidate: Arc<str> = format!("{}_{}", prefix, counter).into();

      if self.taken.insert(candidate.clone()) {
        trace!(name = %candidate, "allocated name");
        return candidate;
      }
    }
  }

  /// Reserve an explicit name.
  pub fn reserve(&mut self, name: &str) -> Result<Arc<str>> {
    let name: Arc<str> = name.into();

    if !self.taken.insert(name.clone()) {
      return Err(KslError::NameCollision {
        name: name.to_string(),
      });
    }

    trace!(name = %name, "reserved name");
    Ok(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.taken.contains(name)
  }

  pub fn len(&self) -> usize {
    self.taken.len()
  }

  pub fn is_empty(&self) -> bool {
    self.taken.is_empty()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn counters_per_prefix() {
    let mut pool = NamePool::new();

    assert_eq!(&*pool.next_name("f3"), "f3_1");
    assert_eq!(&*pool.next_name("f3"), "f3_2");
    assert_eq!(&*pool.next_name("m4"), "m4_1");
    assert_eq!(pool.len(), 3);
  }

  #[test]
  fn explicit_names_collide() {
    let mut pool = NamePool::new();

    pool.reserve("uViewProj").unwrap();
    assert_eq!(
      pool.reserve("uViewProj"),
      Err(KslError::NameCollision {
        name: "uViewProj".to_owned()
      })
    );
  }

  #[test]
  fn generated_names_skip_explicit_ones() {
    let mut pool = NamePool::new();

    pool.reserve("f1_1").unwrap();
    assert_eq!(&*pool.next_name("f1"), "f1_2");
    assert!(pool.reserve("f1_2").is_err());
  }
}
