//! Cache key derivation.
//!
//! A rendered page is addressed by the view name plus a SHA-512 fingerprint of
//! the canonical property JSON, and by the page title when one is set.

use std::fmt;

use sha2::{Digest, Sha512};

use crate::domain::view::{Properties, ViewRequest};

pub const FINGERPRINT_LEN: usize = 64;

/// SHA-512 digest of a canonical property payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full 128-char digests drown log lines.
        write!(f, "Fingerprint({}…)", &self.to_hex()[..16])
    }
}

/// Fingerprint a property payload.
pub fn fingerprint(properties: &Properties) -> Fingerprint {
    fingerprint_json(&properties.to_canonical_json())
}

/// Fingerprint an already canonical JSON string.
pub fn fingerprint_json(canonical_json: &str) -> Fingerprint {
    let mut hasher = Sha512::new();
    hasher.update(canonical_json.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; FINGERPRINT_LEN];
    bytes.copy_from_slice(&digest[..]);
    Fingerprint(bytes)
}

/// Render cache key: `(view name, fingerprint, title)`.
///
/// Displays as `name:hexdigest`, followed by `#title` for titled pages. The
/// structured form keeps a name containing `:` from colliding with another
/// name/digest pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    name: String,
    fingerprint: Fingerprint,
    title: Option<String>,
}

impl ViewKey {
    pub fn new(name: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            name: name.into(),
            fingerprint,
            title: None,
        }
    }

    /// Key a page whose shell carries `title`. Blank titles render as the
    /// bare site name, so they share the untitled key.
    pub fn with_title(mut self, title: Option<&str>) -> Self {
        self.title = title
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_owned);
        self
    }

    pub fn for_request(request: &ViewRequest) -> Self {
        Self::new(request.name(), fingerprint(request.properties()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.fingerprint)?;
        if let Some(title) = &self.title {
            write!(f, "#{title}")?;
        }
        Ok(())
    }
}
