//! Department directory: which folder, index and assistant belong to a department.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub folder_id: String,
    #[serde(rename = "vectorStoreId", alias = "indexId")]
    pub index_id: String,
    pub assistant_id: String,
}

/// Department entries keyed by department name, e.g. `hr`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentDirectory {
    departments: BTreeMap<String, Department>,
}

impl DepartmentDirectory {
    /// Parse a JSON object of `{ "<key>": { folderId, vectorStoreId, assistantId } }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let departments: BTreeMap<String, Department> = serde_json::from_str(json)?;
        if let Some(key) = departments.keys().find(|key| key.trim().is_empty()) {
            return Err(Error::InvalidInput(format!(
                "department key {key:?} must not be blank"
            )));
        }
        Ok(Self { departments })
    }

    /// Load the directory from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let directory = Self::from_json(&json)?;
        tracing::info!(
            departments = directory.len(),
            "Loaded department directory from {}",
            path.display()
        );
        Ok(directory)
    }

    pub fn get(&self, key: &str) -> Option<&Department> {
        self.departments.get(key)
    }

    /// Department keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.departments.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.departments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
    }
}

/// Message sent upstream when chatting on behalf of a department.
pub fn department_message(department: &str, message: &str) -> String {
    format!("Department: {department}\n\n{message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    const DIRECTORY: &str = r#"{
        "marketing": { "folderId": "folder-mkt", "vectorStoreId": "vs_mkt", "assistantId": "asst_mkt" },
        "hr": { "folderId": "folder-hr", "indexId": "vs_hr", "assistantId": "asst_hr" }
    }"#;

    #[test]
    fn parses_entries_and_sorts_keys() {
        let directory = DepartmentDirectory::from_json(DIRECTORY).unwrap();
        assert_eq!(directory.keys(), vec!["hr".to_string(), "marketing".to_string()]);
        assert_eq!(
            directory.get("hr"),
            Some(&Department {
                folder_id: "folder-hr".to_string(),
                index_id: "vs_hr".to_string(),
                assistant_id: "asst_hr".to_string(),
            })
        );
        assert!(directory.get("legal").is_none());
    }

    #[test]
    fn rejects_incomplete_entries() {
        let result = DepartmentDirectory::from_json(r#"{ "hr": { "folderId": "folder-hr" } }"#);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn rejects_blank_keys() {
        let result = DepartmentDirectory::from_json(
            r#"{ " ": { "folderId": "f", "vectorStoreId": "v", "assistantId": "a" } }"#,
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn loads_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), DIRECTORY).unwrap();

        let directory = DepartmentDirectory::load(file.path()).unwrap();
        assert_eq!(directory.len(), 2);
    }

    #[test]
    fn department_message_prefixes_key() {
        assert_eq!(
            department_message("hr", "How many PTO days?"),
            "Department: hr\n\nHow many PTO days?"
        );
    }
}
