//! Operation tags that select how a repository executes a call.

/// Which execution strategy a repository should apply.
///
/// Plain repositories usually ignore the tag; [`CacheRepository`] dispatches on it.
///
/// [`CacheRepository`]: crate::repository::CacheRepository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Operation {
  /// Let the repository pick its preferred strategy
  #[default]
  Default,
  /// Main data source only (e.g. network)
  Main,
  /// Main data source, then write the result through to the cache
  MainSync,
  /// Cache only
  Cache,
  /// Cache first, refreshing from the main source when missing or invalid
  CacheSync,
}

impl Operation {
  /// Parse the kebab-case name used on the command line.
  pub fn from_name(name: &str) -> Option<Self> {
    match name.trim().to_lowercase().as_str() {
      "default" => Some(Self::Default),
      "main" => Some(Self::Main),
      "main-sync" => Some(Self::MainSync),
      "cache" => Some(Self::Cache),
      "cache-sync" => Some(Self::CacheSync),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_operation() {
    assert_eq!(Operation::default(), Operation::Default);
  }

  #[test]
  fn test_from_name() {
    assert_eq!(Operation::from_name("cache-sync"), Some(Operation::CacheSync));
    assert_eq!(Operation::from_name(" Main "), Some(Operation::Main));
    assert_eq!(Operation::from_name("network"), None);
  }
}
