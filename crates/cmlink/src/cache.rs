//! Profile handle cache.
//!
//! Every native profile open is routed through one injectable
//! [`ProfileCache`] instance; it guarantees at most one open native handle
//! per [`ProfileIdentity`] at any time. Checkouts are `Arc` clones, so the
//! reference count replaces the manual acquire/release discipline of a
//! C-style handle table: a handle is destroyed only by
//! [`ProfileCache::evict_unused`] or [`ProfileCache::clear`], and only
//! when no caller still holds a clone.

use crate::OpenError;
use cmlink_core::ColorProfile;
use cmlink_engine::{Engine, EngineProfile};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// Deterministic cache key: profile content hash plus the parameters the
/// handle was opened under.
///
/// Two identities are equal iff they would produce bit-identical native
/// handles. Plain opens use empty parameters; synthesized abstract
/// profiles encode intents and flags in the parameter text (see
/// [`crate::synthesize`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileIdentity {
    hash: [u8; 16],
    params: String,
}

impl ProfileIdentity {
    /// Identity of a profile opened with default parameters.
    pub fn new(profile: &ColorProfile) -> Self {
        Self {
            hash: profile.content_hash(),
            params: String::new(),
        }
    }

    /// Identity of a profile opened or derived under `params`.
    pub fn with_params(profile: &ColorProfile, params: impl Into<String>) -> Self {
        Self {
            hash: profile.content_hash(),
            params: params.into(),
        }
    }

    /// The parameter text.
    pub fn params(&self) -> &str {
        &self.params
    }
}

impl std::fmt::Display for ProfileIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.hash {
            write!(f, "{byte:02x}")?;
        }
        if !self.params.is_empty() {
            write!(f, " {}", self.params)?;
        }
        Ok(())
    }
}

/// A cached native handle plus the profile it was opened from.
pub struct CachedProfile {
    identity: ProfileIdentity,
    handle: Box<dyn EngineProfile>,
    source: Option<ColorProfile>,
}

impl CachedProfile {
    /// Wraps a freshly opened handle for insertion into the cache.
    pub fn new(
        identity: ProfileIdentity,
        handle: Box<dyn EngineProfile>,
        source: Option<ColorProfile>,
    ) -> Self {
        Self {
            identity,
            handle,
            source,
        }
    }

    /// The native handle.
    pub fn handle(&self) -> &dyn EngineProfile {
        self.handle.as_ref()
    }

    /// The profile bytes this handle was opened from, when known.
    pub fn source(&self) -> Option<&ColorProfile> {
        self.source.as_ref()
    }

    /// The identity this handle is cached under.
    pub fn identity(&self) -> &ProfileIdentity {
        &self.identity
    }
}

impl std::fmt::Debug for CachedProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedProfile")
            .field("identity", &self.identity.to_string())
            .finish_non_exhaustive()
    }
}

/// A checked-out profile handle. Dropping it releases the reference.
pub type SharedProfile = Arc<CachedProfile>;

type Slot = Arc<Mutex<Option<SharedProfile>>>;

/// The process-wide profile handle cache.
///
/// One instance is constructed per process (or per test) around the
/// engine backend and passed explicitly wherever profiles are resolved.
///
/// # Example
///
/// ```rust
/// use cmlink::ProfileCache;
/// use cmlink_engine::MockEngine;
/// use std::sync::Arc;
///
/// let cache = ProfileCache::new(Arc::new(MockEngine::new()));
/// assert!(cache.is_empty());
/// ```
pub struct ProfileCache {
    engine: Arc<dyn Engine>,
    slots: Mutex<HashMap<ProfileIdentity, Slot>>,
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ProfileCache {
    /// Creates a cache over the given engine backend.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The engine this cache opens handles through.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Returns the cached handle for `identity`, or opens one.
    ///
    /// `open_fn` runs at most once per identity: concurrent callers for
    /// the same identity wait on a per-identity slot and all receive
    /// clones of the same handle. Failures are not cached; the slot is
    /// left empty so a later acquire retries, and [`Self::evict_unused`]
    /// reclaims slots that never opened.
    pub fn acquire<F>(&self, identity: ProfileIdentity, open_fn: F) -> Result<SharedProfile, OpenError>
    where
        F: FnOnce() -> Result<CachedProfile, OpenError>,
    {
        if !self.engine.is_available() {
            return Err(OpenError::EngineUnavailable);
        }

        let slot: Slot = {
            let mut slots = lock_ignoring_poison(&self.slots);
            slots.entry(identity.clone()).or_default().clone()
        };

        // The slot lock serializes opens for this identity only; opens for
        // other identities proceed in parallel.
        let mut guard = lock_ignoring_poison(&slot);
        if let Some(handle) = guard.as_ref() {
            trace!(identity = %identity, "profile cache hit");
            return Ok(Arc::clone(handle));
        }

        match open_fn() {
            Ok(opened) => {
                debug!(identity = %identity, "profile cache insert");
                let shared = Arc::new(opened);
                *guard = Some(Arc::clone(&shared));
                Ok(shared)
            }
            Err(err) => {
                // Leave the empty slot in the map. Removing it here could
                // orphan a concurrent caller that already fetched the slot
                // and is about to open into it, splitting one identity
                // across two handles. `evict_unused` reclaims empty slots.
                debug!(identity = %identity, "profile open failed");
                Err(err)
            }
        }
    }

    /// Opens `profile` through the engine under its default identity.
    pub fn acquire_profile(&self, profile: &ColorProfile) -> Result<SharedProfile, OpenError> {
        let identity = ProfileIdentity::new(profile);
        self.acquire(identity.clone(), || {
            let handle = self.engine.open_profile(profile.bytes())?;
            Ok(CachedProfile::new(identity, handle, Some(profile.clone())))
        })
    }

    /// Number of cached identities, including ones mid-open.
    pub fn len(&self) -> usize {
        lock_ignoring_poison(&self.slots).len()
    }

    /// Whether the cache holds no identities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops handles no caller holds a reference to.
    ///
    /// Lazy eviction: a zero-reference handle stays cached until this is
    /// called. Slots currently being opened by another thread are kept.
    pub fn evict_unused(&self) {
        let mut slots = lock_ignoring_poison(&self.slots);
        slots.retain(|identity, slot| {
            let Ok(guard) = slot.try_lock() else {
                return true;
            };
            match guard.as_ref() {
                // One reference is the cache's own.
                Some(handle) => {
                    let live = Arc::strong_count(handle) > 1;
                    if !live {
                        trace!(identity = %identity, "evicting unused profile handle");
                    }
                    live
                }
                None => false,
            }
        });
    }

    /// Releases every cached handle.
    ///
    /// Callers still holding clones keep their handles alive until they
    /// drop them; the cache simply forgets its references.
    pub fn clear(&self) {
        lock_ignoring_poison(&self.slots).clear();
    }
}

impl std::fmt::Debug for ProfileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCache")
            .field("engine", &self.engine.name())
            .field("len", &self.len())
            .finish()
    }
}
