//! Process-wide provider cache.
//!
//! Each provider is built at most once, on its first `load`, and lives until
//! process exit. The registry is passed explicitly to whoever needs kernels;
//! [`ProviderRegistry::global`] exists for callers that want the shared
//! instance configured from the environment.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::provider::{InferenceOps, ProviderKind};
use crate::types::{KernelError, KernelResult};

/// Comma-separated provider names to treat as unavailable.
pub const DISABLE_ENV: &str = "INFERENCE_OPS_DISABLE";

#[derive(Debug, Default)]
pub struct ProviderRegistry {
    disabled: BTreeSet<ProviderKind>,
    loaded: Mutex<HashMap<ProviderKind, Arc<dyn InferenceOps>>>,
    builds: [AtomicUsize; 2],
}

static GLOBAL: OnceLock<ProviderRegistry> = OnceLock::new();

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that reports the given providers as unavailable.
    pub fn with_disabled(disabled: impl IntoIterator<Item = ProviderKind>) -> Self {
        Self {
            disabled: disabled.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Registry configured from `INFERENCE_OPS_DISABLE`.
    pub fn from_env() -> KernelResult<Self> {
        match std::env::var(DISABLE_ENV) {
            Ok(value) => Ok(Self::with_disabled(parse_disabled(&value)?)),
            Err(_) => Ok(Self::new()),
        }
    }

    /// Shared registry, initialized once from the environment and never torn down.
    ///
    /// An invalid `INFERENCE_OPS_DISABLE` value is logged and ignored.
    pub fn global() -> &'static ProviderRegistry {
        GLOBAL.get_or_init(|| {
            Self::from_env().unwrap_or_else(|e| {
                log::warn!("Ignoring {}: {}", DISABLE_ENV, e);
                Self::new()
            })
        })
    }

    /// Return the cached provider, building it on first use.
    pub fn load(&self, kind: ProviderKind) -> KernelResult<Arc<dyn InferenceOps>> {
        self.check(kind)?;

        // Hold the lock across the build so racing first loads build once.
        let mut loaded = self
            .loaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(ops) = loaded.get(&kind) {
            log::debug!("Provider cache hit: {}", kind);
            return Ok(Arc::clone(ops));
        }

        let ops = kind.build();
        self.builds[kind as usize].fetch_add(1, Ordering::Relaxed);
        loaded.insert(kind, Arc::clone(&ops));
        Ok(ops)
    }

    /// Availability of every provider, keyed by name.
    pub fn compatible_ops(&self) -> BTreeMap<&'static str, bool> {
        ProviderKind::ALL
            .into_iter()
            .map(|kind| (kind.name(), self.check(kind).is_ok()))
            .collect()
    }

    /// How many times `kind` has been built by this registry (0 or 1).
    pub fn build_count(&self, kind: ProviderKind) -> usize {
        self.builds[kind as usize].load(Ordering::Relaxed)
    }

    fn check(&self, kind: ProviderKind) -> KernelResult<()> {
        if self.disabled.contains(&kind) {
            return Err(KernelError::Unavailable {
                provider: kind.name(),
                reason: format!("disabled via {}", DISABLE_ENV),
            });
        }
        kind.is_compatible().map_err(|reason| KernelError::Unavailable {
            provider: kind.name(),
            reason,
        })
    }
}

fn parse_disabled(value: &str) -> KernelResult<Vec<ProviderKind>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| {
            ProviderKind::from_name(name)
                .ok_or_else(|| KernelError::InvalidConfig(format!("unknown provider {:?}", name)))
        })
        .collect()
}
