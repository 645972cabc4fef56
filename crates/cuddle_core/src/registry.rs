use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::SectionError;
use crate::section::{CellContent, SectionKey, SectionProvider, TableSection};

/// Rendered copy of one installed section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionView {
    pub key: SectionKey,
    pub name: String,
    pub rows: Vec<CellContent>,
}

/// Section providers keyed by [`SectionKey`].
///
/// Writers go through the lock; the list view reads after a load has
/// completed.
#[derive(Debug, Default)]
pub struct SectionRegistry {
    providers: RwLock<BTreeMap<SectionKey, Arc<SectionProvider>>>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `provider` under `key`. A provider built for another section
    /// is rejected and the registry is left as it was.
    pub fn set(&self, key: SectionKey, provider: SectionProvider) -> Result<(), SectionError> {
        if provider.key() != key {
            return Err(SectionError::KeyMismatch {
                key,
                provider: provider.key(),
            });
        }
        self.providers.write().insert(key, Arc::new(provider));
        Ok(())
    }

    /// Installs every provider under a single write guard, so readers see
    /// either none or all of them.
    pub fn replace_all(&self, providers: impl IntoIterator<Item = SectionProvider>) {
        let staged: Vec<(SectionKey, Arc<SectionProvider>)> = providers
            .into_iter()
            .map(|provider| (provider.key(), Arc::new(provider)))
            .collect();
        let mut map = self.providers.write();
        for (key, provider) in staged {
            map.insert(key, provider);
        }
    }

    pub fn clear(&self) {
        self.providers.write().clear();
    }

    pub fn get(&self, key: SectionKey) -> Option<Arc<SectionProvider>> {
        self.providers.read().get(&key).cloned()
    }

    pub fn count(&self) -> usize {
        self.providers.read().len()
    }

    pub fn ordered_keys(&self) -> Vec<SectionKey> {
        self.providers.read().keys().copied().collect()
    }

    /// Key shown at table-section `index`.
    pub fn key_at(&self, index: usize) -> Option<SectionKey> {
        self.providers.read().keys().nth(index).copied()
    }

    pub fn name(&self, key: SectionKey) -> Option<String> {
        self.get(key).map(|p| p.name().to_string())
    }

    pub fn row_count(&self, key: SectionKey) -> usize {
        self.get(key).map(|p| p.row_count()).unwrap_or(0)
    }

    pub fn cell_content(&self, key: SectionKey, row: usize) -> Option<CellContent> {
        self.get(key)?.cell_content(row)
    }

    /// Identifier of the pending request shown at `row`.
    pub fn pending_identifier(&self, row: usize) -> Option<String> {
        let provider = self.get(SectionKey::Pending)?;
        match provider.as_ref() {
            SectionProvider::Pending(section) => section.identifier_at(row).map(str::to_string),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Vec<SectionView> {
        self.providers
            .read()
            .iter()
            .map(|(key, provider)| SectionView {
                key: *key,
                name: provider.name().to_string(),
                rows: provider.rows(),
            })
            .collect()
    }
}
