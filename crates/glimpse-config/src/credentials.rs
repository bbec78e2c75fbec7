use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// How requests to Google endpoints are authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleAuth {
    /// Sent as the `x-goog-api-key` header
    ApiKey(String),
    /// OAuth bearer token, e.g. from `gcloud auth print-access-token`
    AccessToken(String),
}

impl GoogleAuth {
    /// Header name and value to attach to a request
    pub fn header(&self) -> (&'static str, String) {
        match self {
            Self::ApiKey(key) => ("x-goog-api-key", key.clone()),
            Self::AccessToken(token) => ("Authorization", format!("Bearer {token}")),
        }
    }
}

/// Credential material read from the user's Google credential file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleCredentials {
    pub project_id: Option<String>,
    pub auth: GoogleAuth,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Credentials file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read credentials file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid credentials file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Credentials file has neither `api_key` nor `access_token`")]
    MissingSecret,
}

#[derive(Deserialize)]
struct CredentialFile {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl GoogleCredentials {
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        if !path.is_file() {
            return Err(CredentialError::NotFound(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, CredentialError> {
        let file: CredentialFile = serde_json::from_str(data)?;
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        // A token wins over a key when both are present
        let auth = match (non_empty(file.access_token), non_empty(file.api_key)) {
            (Some(token), _) => GoogleAuth::AccessToken(token),
            (None, Some(key)) => GoogleAuth::ApiKey(key),
            (None, None) => return Err(CredentialError::MissingSecret),
        };

        Ok(Self {
            project_id: non_empty(file.project_id),
            auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_api_key_credentials() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"project_id": "demo-project", "api_key": "abc"}}"#).unwrap();

        let creds = GoogleCredentials::load(file.path()).unwrap();
        assert_eq!(creds.project_id.as_deref(), Some("demo-project"));
        assert_eq!(creds.auth, GoogleAuth::ApiKey("abc".into()));
    }

    #[test]
    fn test_access_token_preferred() {
        let creds =
            GoogleCredentials::from_json(r#"{"api_key": "abc", "access_token": "ya29.token"}"#)
                .unwrap();
        assert_eq!(creds.auth, GoogleAuth::AccessToken("ya29.token".into()));
        assert!(creds.project_id.is_none());
    }

    #[test]
    fn test_missing_secret_rejected() {
        let err = GoogleCredentials::from_json(r#"{"type": "service_account"}"#).unwrap_err();
        assert!(matches!(err, CredentialError::MissingSecret));
    }

    #[test]
    fn test_missing_file() {
        let err = GoogleCredentials::load(Path::new("/no/such/creds.json")).unwrap_err();
        assert!(matches!(err, CredentialError::NotFound(_)));
    }
}
