use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy::json_abi::{JsonAbi, StateMutability};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const REGISTRY_FILE: &str = "exercises.json";
const APP_DIR: &str = "contract-proxy";

/// Exercise set deployed for the dashboard, compiled into the binary.
static BUILTIN_REGISTRY: &str = include_str!("../../registry/exercises.json");

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid registry JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("exercise id must not be empty")]
    EmptyId,
    #[error("duplicate exercise id `{0}`")]
    DuplicateId(String),
}

/// Where the active registry was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    File(PathBuf),
    Builtin,
}

impl std::fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrySource::File(path) => write!(f, "{}", path.display()),
            RegistrySource::Builtin => write!(f, "built-in"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    exercises: Vec<ExerciseEntry>,
}

#[derive(Debug, Deserialize)]
struct ExerciseEntry {
    id: String,
    address: Address,
    abi: JsonAbi,
}

/// One deployed exercise contract: a fixed address bound to its ABI.
#[derive(Debug, Clone)]
pub struct Exercise {
    pub id: String,
    pub address: Address,
    pub abi: Arc<JsonAbi>,
}

impl Exercise {
    /// Names of the view/pure functions, sorted and deduplicated.
    pub fn read_functions(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .abi
            .functions()
            .filter(|f| {
                matches!(
                    f.state_mutability,
                    StateMutability::View | StateMutability::Pure
                )
            })
            .map(|f| f.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Listing entry returned by `GET /api/exercises`.
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseSummary {
    pub id: String,
    pub address: String,
    pub functions: Vec<String>,
}

impl From<&Exercise> for ExerciseSummary {
    fn from(exercise: &Exercise) -> Self {
        Self {
            id: exercise.id.clone(),
            address: exercise.address.to_checksum(None),
            functions: exercise.read_functions(),
        }
    }
}

/// Mapping from exercise id to `(address, ABI)`, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct ExerciseRegistry {
    exercises: BTreeMap<String, Exercise>,
}

impl ExerciseRegistry {
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_json(BUILTIN_REGISTRY)
    }

    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        let mut exercises = BTreeMap::new();
        for entry in file.exercises {
            let id = entry.id.trim().to_string();
            if id.is_empty() {
                return Err(RegistryError::EmptyId);
            }
            if exercises.contains_key(&id) {
                return Err(RegistryError::DuplicateId(id));
            }
            exercises.insert(
                id.clone(),
                Exercise {
                    id,
                    address: entry.address,
                    abi: Arc::new(entry.abi),
                },
            );
        }
        Ok(Self { exercises })
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let data = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    /// Load from `explicit` if given, else from the user config dir if a
    /// registry exists there, else fall back to the built-in set.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, RegistrySource), RegistryError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, RegistrySource::File(path.to_path_buf())));
        }
        match registry_path() {
            Some(path) if path.is_file() => {
                let registry = Self::load(&path)?;
                Ok((registry, RegistrySource::File(path)))
            }
            _ => Ok((Self::builtin()?, RegistrySource::Builtin)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exercise> {
        self.exercises.values()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

/// Get the path to the user's registry file.
fn registry_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join(APP_DIR).join(REGISTRY_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_builtin_registry_parses() {
        let registry = ExerciseRegistry::builtin().unwrap();
        assert!(registry.len() >= 10);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_builtin_control_structures() {
        let registry = ExerciseRegistry::builtin().unwrap();
        let exercise = registry.get("control-structures").unwrap();
        assert_eq!(
            exercise.address.to_checksum(None),
            "0xaB6B6c13Fd72A92D27096d779F8188F85F4bb5Be"
        );
        assert_eq!(exercise.read_functions(), vec!["doNotDisturb", "fizzBuzz"]);
        assert!(exercise.abi.errors().any(|e| e.name == "AfterHours"));
    }

    #[test]
    fn test_builtin_only_exposes_read_functions() {
        let registry = ExerciseRegistry::builtin().unwrap();
        for exercise in registry.iter() {
            let names: BTreeSet<&String> = exercise.abi.functions().map(|f| &f.name).collect();
            assert_eq!(
                exercise.read_functions().len(),
                names.len(),
                "{} carries state-changing functions",
                exercise.id
            );
        }
    }

    #[test]
    fn test_ids_iterate_sorted() {
        let registry = ExerciseRegistry::builtin().unwrap();
        let ids: Vec<&str> = registry.iter().map(|e| e.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let json = r#"{"exercises": [
            {"id": "a", "address": "0x0000000000000000000000000000000000000001", "abi": []},
            {"id": "a", "address": "0x0000000000000000000000000000000000000002", "abi": []}
        ]}"#;
        assert!(matches!(
            ExerciseRegistry::from_json(json),
            Err(RegistryError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn test_empty_id_rejected() {
        let json = r#"{"exercises": [
            {"id": "  ", "address": "0x0000000000000000000000000000000000000001", "abi": []}
        ]}"#;
        assert!(matches!(
            ExerciseRegistry::from_json(json),
            Err(RegistryError::EmptyId)
        ));
    }

    #[test]
    fn test_bad_address_rejected() {
        let json = r#"{"exercises": [{"id": "a", "address": "0x1234", "abi": []}]}"#;
        assert!(matches!(
            ExerciseRegistry::from_json(json),
            Err(RegistryError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ExerciseRegistry::load(Path::new("/nonexistent/exercises.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/exercises.json"));
    }

    #[test]
    fn test_resolve_explicit_file() {
        let path = std::env::temp_dir().join(format!(
            "contract-proxy-registry-{}.json",
            std::process::id()
        ));
        fs::write(
            &path,
            r#"{"exercises": [{"id": "solo", "address": "0x0000000000000000000000000000000000000001", "abi": []}]}"#,
        )
        .unwrap();
        let (registry, source) = ExerciseRegistry::resolve(Some(&path)).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(registry.len(), 1);
        assert_eq!(source, RegistrySource::File(path));
    }

    #[test]
    fn test_summary_lists_read_functions() {
        let registry = ExerciseRegistry::builtin().unwrap();
        let summary = ExerciseSummary::from(registry.get("basic-math").unwrap());
        assert_eq!(summary.functions, vec!["adder", "subtractor"]);
        assert_eq!(summary.address, "0x2a50A417ee05D7527787C9f5ED7657CF9DaD3BFB");
    }
}
