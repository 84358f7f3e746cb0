use super::{Share, VaultKey};

/// Chooses which of a share's vault keys the content should be opened with
///
/// The selection is only a choice; the chosen key still has to be vouched for
/// by the share's signing key before it is used.
pub trait VaultKeySelector: Send + Sync {
    fn select<'a>(&self, share: &Share, keys: &'a [VaultKey]) -> Option<&'a VaultKey>;
}

/// The first key in the list, whatever its rotation
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstVaultKey;

impl VaultKeySelector for FirstVaultKey {
    fn select<'a>(&self, _share: &Share, keys: &'a [VaultKey]) -> Option<&'a VaultKey> {
        keys.first()
    }
}

/// The key with the highest rotation number
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestRotation;

impl VaultKeySelector for LatestRotation {
    fn select<'a>(&self, _share: &Share, keys: &'a [VaultKey]) -> Option<&'a VaultKey> {
        // max_by_key returns the last maximum; keep the first one on ties
        keys.iter().rev().max_by_key(|key| key.rotation)
    }
}

/// The key whose rotation id matches the share's content rotation
///
/// Unless built with [`ContentRotation::strict`], a share whose rotation id
/// matches none of the keys falls back to [`LatestRotation`].
#[derive(Debug, Clone, Copy)]
pub struct ContentRotation {
    fallback_to_latest: bool,
}

impl Default for ContentRotation {
    fn default() -> Self {
        Self {
            fallback_to_latest: true,
        }
    }
}

impl ContentRotation {
    pub fn strict() -> Self {
        Self {
            fallback_to_latest: false,
        }
    }
}

impl VaultKeySelector for ContentRotation {
    fn select<'a>(&self, share: &Share, keys: &'a [VaultKey]) -> Option<&'a VaultKey> {
        let matching = keys
            .iter()
            .find(|key| key.rotation_id == share.content_rotation_id);
        match matching {
            Some(key) => Some(key),
            None if self.fallback_to_latest => {
                tracing::debug!(
                    share_id = %share.share_id,
                    rotation_id = %share.content_rotation_id,
                    "no vault key for content rotation, using latest"
                );
                LatestRotation.select(share, keys)
            }
            None => None,
        }
    }
}
