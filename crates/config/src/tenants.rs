//! Tenant directory
//!
//! Tenants are loaded from a YAML file:
//!
//! ```yaml
//! default_tenant: serenity
//! tenants:
//!   - id: serenity
//!     name: Serenity Day Spa
//!     sms_number: "+15550100000"
//!     timezone: America/New_York
//!     hours: { mon-fri: "09:00-18:00", sat: "10:00-14:00" }
//!     services:
//!       - key: massage
//!         variants: [deep tissue, swedish]
//!         price: "$95"
//! ```
//!
//! Lookups go by business number first and fall back to the default tenant
//! (or the first one listed) so a misrouted number still gets an answer.

use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use receptionist_core::{normalize_phone, TenantConfig};

use crate::ConfigError;

#[derive(Debug, Deserialize)]
struct TenantFile {
    #[serde(default)]
    default_tenant: Option<String>,
    #[serde(default)]
    tenants: Vec<TenantConfig>,
}

/// Immutable snapshot of all tenants
#[derive(Debug, Clone)]
pub struct TenantDirectory {
    tenants: Vec<Arc<TenantConfig>>,
    by_id: HashMap<String, usize>,
    by_number: HashMap<String, usize>,
    default_index: usize,
}

impl TenantDirectory {
    pub fn new(tenants: Vec<TenantConfig>, default_tenant: Option<&str>) -> Result<Self, ConfigError> {
        if tenants.is_empty() {
            return Err(ConfigError::MissingField("tenants".to_string()));
        }

        let mut by_id = HashMap::new();
        let mut by_number = HashMap::new();
        for (idx, tenant) in tenants.iter().enumerate() {
            if tenant.id.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("tenants[{}].id", idx),
                    message: "Tenant id cannot be empty".to_string(),
                });
            }
            if by_id.insert(tenant.id.clone(), idx).is_some() {
                return Err(ConfigError::InvalidValue {
                    field: format!("tenants[{}].id", idx),
                    message: format!("Duplicate tenant id '{}'", tenant.id),
                });
            }
            let number = normalize_phone(&tenant.sms_number);
            if !number.is_empty() {
                by_number.insert(number, idx);
            }
        }

        let default_index = match default_tenant {
            Some(id) => *by_id.get(id).ok_or_else(|| ConfigError::InvalidValue {
                field: "default_tenant".to_string(),
                message: format!("Unknown tenant '{}'", id),
            })?,
            None => 0,
        };

        Ok(Self {
            tenants: tenants.into_iter().map(Arc::new).collect(),
            by_id,
            by_number,
            default_index,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let file: TenantFile =
            serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::new(file.tenants, file.default_tenant.as_deref())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        Self::from_yaml(&raw)
    }

    pub fn get(&self, id: &str) -> Option<Arc<TenantConfig>> {
        self.by_id.get(id).map(|&idx| self.tenants[idx].clone())
    }

    pub fn default_tenant(&self) -> Arc<TenantConfig> {
        self.tenants[self.default_index].clone()
    }

    /// Tenant owning the business number, else the default tenant.
    pub fn resolve_by_number(&self, number: &str) -> Arc<TenantConfig> {
        match self.by_number.get(&normalize_phone(number)) {
            Some(&idx) => self.tenants[idx].clone(),
            None => {
                tracing::debug!(number = %number, "No tenant for number, using default");
                self.default_tenant()
            },
        }
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

/// Tenant directory backed by a file and reloaded when stale
///
/// A failed reload keeps serving the previous snapshot.
pub struct TenantRegistry {
    path: Option<PathBuf>,
    max_age: Duration,
    current: RwLock<(Arc<TenantDirectory>, Instant)>,
}

impl TenantRegistry {
    pub fn from_file(path: impl Into<PathBuf>, max_age: Duration) -> Result<Self, ConfigError> {
        let path = path.into();
        let directory = TenantDirectory::load(&path)?;
        tracing::info!(path = %path.display(), tenants = directory.len(), "Loaded tenant directory");
        Ok(Self {
            path: Some(path),
            max_age,
            current: RwLock::new((Arc::new(directory), Instant::now())),
        })
    }

    /// Fixed directory that never reloads
    pub fn fixed(directory: TenantDirectory) -> Self {
        Self {
            path: None,
            max_age: Duration::MAX,
            current: RwLock::new((Arc::new(directory), Instant::now())),
        }
    }

    pub fn snapshot(&self) -> Arc<TenantDirectory> {
        {
            let guard = self.current.read();
            if self.path.is_none() || guard.1.elapsed() < self.max_age {
                return guard.0.clone();
            }
        }
        self.reload()
    }

    fn reload(&self) -> Arc<TenantDirectory> {
        let mut guard = self.current.write();
        if guard.1.elapsed() < self.max_age {
            return guard.0.clone();
        }
        if let Some(path) = &self.path {
            match TenantDirectory::load(path) {
                Ok(directory) => guard.0 = Arc::new(directory),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Tenant reload failed, keeping previous");
                },
            }
        }
        guard.1 = Instant::now();
        guard.0.clone()
    }

    pub fn resolve_by_number(&self, number: &str) -> Arc<TenantConfig> {
        self.snapshot().resolve_by_number(number)
    }

    pub fn get(&self, id: &str) -> Option<Arc<TenantConfig>> {
        self.snapshot().get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::Weekday;
    use std::io::Write;

    const TENANTS: &str = r#"
default_tenant: glow
tenants:
  - id: serenity
    name: Serenity Day Spa
    sms_number: "(555) 010-0000"
    timezone: America/New_York
    hours:
      mon-fri: "09:00-18:00"
      sat: "10:00-14:00"
    services:
      - key: massage
        variants: [deep tissue, swedish]
        price: "$95"
      - key: facial
  - id: glow
    name: Glow Studio
    sms_number: "+15550109999"
    timezone: America/Los_Angeles
"#;

    #[test]
    fn test_parse_directory() {
        let dir = TenantDirectory::from_yaml(TENANTS).unwrap();
        assert_eq!(dir.len(), 2);

        let spa = dir.get("serenity").unwrap();
        assert_eq!(spa.services.len(), 2);
        assert_eq!(spa.services[0].price.as_deref(), Some("$95"));
        assert!(spa.hours.window(Weekday::Wednesday).is_some());
        assert!(spa.hours.window(Weekday::Sunday).is_none());
    }

    #[test]
    fn test_resolve_by_number_with_fallback() {
        let dir = TenantDirectory::from_yaml(TENANTS).unwrap();
        assert_eq!(dir.resolve_by_number("+15550100000").id, "serenity");
        assert_eq!(dir.resolve_by_number("5550109999").id, "glow");
        assert_eq!(dir.resolve_by_number("+19999999999").id, "glow");
    }

    #[test]
    fn test_rejects_bad_directories() {
        assert!(TenantDirectory::from_yaml("tenants: []").is_err());
        assert!(TenantDirectory::from_yaml("default_tenant: nope\ntenants:\n  - id: a\n    name: A\n").is_err());
        assert!(TenantDirectory::from_yaml("tenants:\n  - id: a\n    name: A\n  - id: a\n    name: B\n").is_err());
        assert!(TenantDirectory::from_yaml(
            "tenants:\n  - id: a\n    name: A\n    hours:\n      mon: \"18:00-09:00\"\n"
        )
        .is_err());
    }

    #[test]
    fn test_registry_reloads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tenants.yaml");
        std::fs::File::create(&path).unwrap().write_all(TENANTS.as_bytes()).unwrap();

        let registry = TenantRegistry::from_file(&path, Duration::ZERO).unwrap();
        assert!(registry.get("serenity").is_some());

        std::fs::write(&path, "tenants:\n  - id: solo\n    name: Solo\n").unwrap();
        assert!(registry.get("solo").is_some());
        assert!(registry.get("serenity").is_none());

        // broken file keeps the last good snapshot
        std::fs::write(&path, "tenants: [").unwrap();
        assert!(registry.get("solo").is_some());
    }
}
