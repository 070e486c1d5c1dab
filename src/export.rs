//! JSON export of a finished check

use crate::compare::{compare, ComparisonResult};
use crate::placeholder::Anonymizer;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Exported document. Field order here is the key order in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub username: String,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub mutuals: Vec<String>,
    pub only_followers: Vec<String>,
    pub only_following: Vec<String>,
}

impl ExportDocument {
    pub fn new(
        subject: &str,
        followers: &[String],
        following: &[String],
        comparison: &ComparisonResult,
    ) -> Self {
        Self {
            username: subject.to_string(),
            followers: followers.to_vec(),
            following: following.to_vec(),
            mutuals: comparison.mutual.clone(),
            only_followers: comparison.only_in_a.clone(),
            only_following: comparison.only_in_b.clone(),
        }
    }

    /// Pretty-printed UTF-8 JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Copy of this document with every handle replaced by a placeholder.
    ///
    /// The same handle always gets the same placeholder. Partitions are
    /// recomputed from the aliased lists so they stay sorted.
    pub fn anonymize<R: Rng>(&self, rng: &mut R) -> ExportDocument {
        let mut anonymizer = Anonymizer::new();
        let username = anonymizer.alias(rng, &self.username);
        let followers = anonymizer.alias_all(rng, &self.followers);
        let following = anonymizer.alias_all(rng, &self.following);

        let comparison = compare(&followers, &following);
        ExportDocument::new(&username, &followers, &following, &comparison)
    }

    pub fn filename(&self) -> String {
        export_filename(&self.username)
    }
}

pub fn export_filename(subject: &str) -> String {
    format!("{subject}_data.json")
}

/// Serialize a comparison for `subject`.
pub fn export(
    subject: &str,
    followers: &[String],
    following: &[String],
    comparison: &ComparisonResult,
) -> Result<Vec<u8>, serde_json::Error> {
    ExportDocument::new(subject, followers, following, comparison).to_bytes()
}

/// Write the document into `dir`, returning the file path.
pub async fn write_export(
    dir: &Path,
    document: &ExportDocument,
) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
    let bytes = document.to_bytes()?;
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(document.filename());
    tokio::fs::write(&path, bytes).await?;

    info!("Exported {} to {}", document.username, path.display());
    Ok(path)
}
