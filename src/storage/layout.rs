use std::path::PathBuf;
use std::fs;
use uuid::Uuid;
use crate::core::error::Result;
use crate::core::types::TenantKey;

/// Longest escaped key used verbatim, well under the usual 255-byte limit
/// on a file name.
pub const MAX_ESCAPED_LEN: usize = 120;
const HASHED_PREFIX_LEN: usize = 64;

/// Directory structure for data files
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,       // Root directory, holds the lock file
    pub snapshots_dir: PathBuf,  // One snapshot file per tenant
}

impl StorageLayout {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let snapshots_dir = base_dir.join("snapshots");

        fs::create_dir_all(&snapshots_dir)?;

        Ok(StorageLayout {
            base_dir,
            snapshots_dir,
        })
    }

    pub fn snapshot_path(&self, tenant: &TenantKey) -> PathBuf {
        self.snapshots_dir.join(format!("{}.snap", Self::escape_key(tenant)))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(".lock")
    }

    /// File-name-safe and injective: `[A-Za-z0-9_-]` is kept, every other
    /// byte becomes `%XX`. Names longer than [`MAX_ESCAPED_LEN`] keep a
    /// readable prefix followed by `~` and a name-based UUID of the key;
    /// short names never contain a bare `~`.
    pub fn escape_key(tenant: &TenantKey) -> String {
        let mut escaped = String::with_capacity(tenant.as_str().len());
        for byte in tenant.as_str().bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                escaped.push(byte as char);
            } else {
                escaped.push_str(&format!("%{:02X}", byte));
            }
        }

        if escaped.len() > MAX_ESCAPED_LEN {
            let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, tenant.as_str().as_bytes());
            escaped.truncate(HASHED_PREFIX_LEN);
            escaped.push('~');
            escaped.push_str(&digest.simple().to_string());
        }
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_path_characters() {
        assert_eq!(StorageLayout::escape_key(&TenantKey::from("my-app_1")), "my-app_1");
        assert_eq!(StorageLayout::escape_key(&TenantKey::from("../etc")), "%2E%2E%2Fetc");
        assert_eq!(StorageLayout::escape_key(&TenantKey::from("a%2F")), "a%252F");
        assert_ne!(
            StorageLayout::escape_key(&TenantKey::from("a/b")),
            StorageLayout::escape_key(&TenantKey::from("a%2Fb"))
        );
    }

    #[test]
    fn long_keys_get_bounded_distinct_names() {
        let long = TenantKey::from("a".repeat(300).as_str());
        let longer = TenantKey::from("a".repeat(301).as_str());
        let slashes = TenantKey::from("/".repeat(100).as_str());

        let names: Vec<String> = [&long, &longer, &slashes].iter().map(|k| StorageLayout::escape_key(k)).collect();
        for name in &names {
            assert!(name.len() <= MAX_ESCAPED_LEN);
            assert!(name.contains('~'));
        }
        assert_ne!(names[0], names[1]);
        assert!(names[0].starts_with(&"a".repeat(HASHED_PREFIX_LEN)));
        assert_eq!(names[0], StorageLayout::escape_key(&long));

        let edge = TenantKey::from("b".repeat(MAX_ESCAPED_LEN).as_str());
        assert_eq!(StorageLayout::escape_key(&edge), "b".repeat(MAX_ESCAPED_LEN));
        assert_eq!(StorageLayout::escape_key(&TenantKey::from("x~y")), "x%7Ey");
    }

    #[test]
    fn creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("root")).unwrap();
        assert!(layout.snapshots_dir.is_dir());
        assert!(layout.snapshot_path(&TenantKey::from("app")).ends_with("snapshots/app.snap"));
    }
}
