//! External collaborator interfaces.
//!
//! The transform core neither parses binaries nor prints source text. It
//! consumes already-lifted method bodies through [`MethodSource`], resolves
//! well-known member identities through [`MemberResolver`] and optionally
//! consults a [`DebugInfoProvider`] for display hints. All three are traits
//! implemented by the hosting loader.
//!
//! # Resolution Semantics
//!
//! "Not found" is a defined result (`None`), never an error. Every matcher
//! that depends on an identity comparison treats resolver absence as "no
//! match" - absence must never be conflated with a positive match.
//!
//! # Thread Safety
//!
//! Batch decompilation queries the resolver concurrently from worker
//! threads, so implementations must be safe for concurrent read-only use
//! (`Send + Sync`). The core never mutates the resolver.

use dashmap::DashMap;

use crate::ast::{AstFunction, MemberRef};
use crate::decompiler::DeclarationRef;

/// Provides lifted method bodies for declarations.
///
/// The loader guarantees well-formedness of what it hands out; the core does
/// not re-validate container structure.
pub trait MethodSource: Send + Sync {
    /// Returns the lifted instruction tree for `declaration`, or `None` if
    /// the declaration has no body (abstract, extern, or stripped).
    fn method_body(&self, declaration: &DeclarationRef) -> Option<AstFunction>;

    /// Returns the raw documentation comment attached to `declaration`, if
    /// the loader carries one.
    fn doc_comment(&self, _declaration: &DeclarationRef) -> Option<String> {
        None
    }
}

/// Resolves member identities against loaded metadata.
pub trait MemberResolver: Send + Sync {
    /// Resolves `(declaring_type, name, arity)` to a member reference.
    ///
    /// Returns `None` when the member does not exist in the loaded metadata.
    fn resolve(&self, declaring_type: &str, name: &str, arity: usize) -> Option<MemberRef>;
}

/// Best-effort provider of source-line hints from debug symbols.
pub trait DebugInfoProvider: Send + Sync {
    /// Returns the original source line for a bytecode offset, if the debug
    /// symbols cover it. Absence is valid and common.
    fn line_hint(&self, offset: u32) -> Option<u32>;
}

/// A resolver that knows no members.
///
/// Useful as a default: every identity-dependent pass simply never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyResolver;

impl MemberResolver for EmptyResolver {
    fn resolve(&self, _declaring_type: &str, _name: &str, _arity: usize) -> Option<MemberRef> {
        None
    }
}

/// A concurrent memoizing adapter over any [`MemberResolver`].
///
/// Batch decompilation resolves the same handful of well-known members for
/// every declaration; the cache turns repeated lookups into lock-free map
/// hits. Negative results are cached too, so a resolver that answers `None`
/// is only asked once per identity.
pub struct ResolverCache<'r> {
    inner: &'r dyn MemberResolver,
    cache: DashMap<(String, String, usize), Option<MemberRef>>,
}

impl<'r> ResolverCache<'r> {
    /// Wraps `inner` with a fresh cache.
    #[must_use]
    pub fn new(inner: &'r dyn MemberResolver) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Returns the number of distinct identities queried so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if no identities have been queried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl MemberResolver for ResolverCache<'_> {
    fn resolve(&self, declaring_type: &str, name: &str, arity: usize) -> Option<MemberRef> {
        let key = (declaring_type.to_string(), name.to_string(), arity);
        if let Some(hit) = self.cache.get(&key) {
            return hit.value().clone();
        }
        let resolved = self.inner.resolve(declaring_type, name, arity);
        self.cache.insert(key, resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl MemberResolver for CountingResolver {
        fn resolve(&self, declaring_type: &str, name: &str, arity: usize) -> Option<MemberRef> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if declaring_type == "System.Type" {
                Some(MemberRef::new(declaring_type, name, arity))
            } else {
                None
            }
        }
    }

    #[test]
    fn test_empty_resolver_always_none() {
        assert!(EmptyResolver
            .resolve("System.Type", "GetTypeFromHandle", 1)
            .is_none());
    }

    #[test]
    fn test_cache_memoizes_hits_and_misses() {
        let inner = CountingResolver {
            calls: AtomicUsize::new(0),
        };
        let cache = ResolverCache::new(&inner);

        for _ in 0..3 {
            assert!(cache.resolve("System.Type", "GetTypeFromHandle", 1).is_some());
            assert!(cache.resolve("Missing.Type", "M", 0).is_none());
        }

        // One underlying call per distinct identity.
        assert_eq!(inner.calls.load(Ordering::Relaxed), 2);
        assert_eq!(cache.len(), 2);
    }
}
