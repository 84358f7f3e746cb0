//! Decrypted vaults
//!
//! A [`Vault`] only comes out of [`VaultAssembler`], which only runs on
//! content that passed the trust chain and the content signature checks.

use serde::{Deserialize, Serialize};

use crate::share::Share;

/// The only content format this crate understands
pub const CONTENT_FORMAT_VERSION: u16 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed vault content: {0}")]
    MalformedContent(String),
    #[error("unsupported content format version {0}")]
    UnsupportedFormat(u16),
}

/// How a vault is shown to the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPreferences {
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub icon: u32,
}

/// The decrypted, schema-level payload of a vault share
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultContent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display: Option<DisplayPreferences>,
}

/// Serialization of [`VaultContent`]
pub trait VaultContentCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<VaultContent, ParseError>;
    fn encode(&self, content: &VaultContent) -> Result<Vec<u8>, ParseError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl VaultContentCodec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<VaultContent, ParseError> {
        serde_json::from_slice(bytes).map_err(|e| ParseError::MalformedContent(e.to_string()))
    }

    fn encode(&self, content: &VaultContent) -> Result<Vec<u8>, ParseError> {
        serde_json::to_vec(content).map_err(|e| ParseError::MalformedContent(e.to_string()))
    }
}

/// A verified, decrypted vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vault {
    id: String,
    share_id: String,
    name: String,
    description: String,
    display: DisplayPreferences,
    is_admin: bool,
}

impl Vault {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn share_id(&self) -> &str {
        &self.share_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn display(&self) -> DisplayPreferences {
        self.display
    }

    /// Whether the user administers the share the vault was opened from
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

#[derive(Debug, Clone, Default)]
pub struct VaultAssembler<C = JsonCodec> {
    codec: C,
}

impl<C: VaultContentCodec> VaultAssembler<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Parse decrypted content into a [`Vault`]
    pub fn assemble(
        &self,
        share_id: &str,
        vault_id: &str,
        plain_content: &[u8],
    ) -> Result<Vault, ParseError> {
        let content = self.codec.decode(plain_content)?;
        Ok(Vault {
            id: vault_id.to_string(),
            share_id: share_id.to_string(),
            name: content.name,
            description: content.description,
            display: content.display.unwrap_or_default(),
            is_admin: false,
        })
    }

    /// [`Self::assemble`] for a share, checking its content format version
    pub fn assemble_share(&self, share: &Share, plain_content: &[u8]) -> Result<Vault, ParseError> {
        if share.content_format_version != CONTENT_FORMAT_VERSION {
            return Err(ParseError::UnsupportedFormat(share.content_format_version));
        }
        let mut vault = self.assemble(&share.share_id, &share.vault_id, plain_content)?;
        vault.is_admin = share.is_admin();
        Ok(vault)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_assemble() {
        let content = VaultContent {
            name: "Personal".into(),
            description: "my things".into(),
            display: Some(DisplayPreferences { color: 3, icon: 7 }),
        };
        let assembler = VaultAssembler::<JsonCodec>::default();
        let bytes = assembler.codec().encode(&content).unwrap();

        let vault = assembler.assemble("share-1", "vault-1", &bytes).unwrap();
        assert_eq!(vault.id(), "vault-1");
        assert_eq!(vault.share_id(), "share-1");
        assert_eq!(vault.name(), "Personal");
        assert_eq!(vault.description(), "my things");
        assert_eq!(vault.display(), DisplayPreferences { color: 3, icon: 7 });
        assert!(!vault.is_admin());
    }

    #[test]
    fn test_missing_optional_fields() {
        let vault = VaultAssembler::<JsonCodec>::default()
            .assemble("s", "v", br#"{"name":"Work"}"#)
            .unwrap();
        assert_eq!(vault.description(), "");
        assert_eq!(vault.display(), DisplayPreferences::default());
    }

    #[test]
    fn test_malformed_content() {
        let assembler = VaultAssembler::<JsonCodec>::default();
        let cases: [&[u8]; 3] = [b"not json", br#"{"description":"no name"}"#, b""];
        for bytes in cases {
            let err = assembler.assemble("s", "v", bytes).unwrap_err();
            assert!(matches!(err, ParseError::MalformedContent(_)));
        }
    }
}
