use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PubsealError;

/// Opaque, immutable publication identifier (UUID v4 text form when
/// generated here, but any non-empty string is accepted on lookup).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationId(String);

impl PublicationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PublicationId {
    type Err = PubsealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PubsealError::InvalidInput("empty publication id".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Display for PublicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle returned by the content store for a stored blob.
///
/// Treated as opaque by everything except the store that minted it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Active,
    Revoked,
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicationStatus::Active => f.write_str("active"),
            PublicationStatus::Revoked => f.write_str("revoked"),
        }
    }
}

/// Argon2id parameters recorded alongside a publication so the key can be
/// re-derived even after the configured defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfSettings {
    pub mem_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KdfSettings {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Free-form, searchable metadata supplied by the publisher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationMetadata {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl PublicationMetadata {
    /// Split a comma-separated keyword list, dropping blanks.
    pub fn parse_keywords(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// The durable record of one published artifact.
///
/// Never holds the secret or the plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: PublicationId,
    pub title: String,
    pub description: String,
    pub domain: String,
    pub keywords: Vec<String>,
    pub content_address: ContentAddress,
    #[serde(with = "b64")]
    pub salt: Vec<u8>,
    pub kdf: KdfSettings,
    pub key_fingerprint: String,
    pub owner_id: String,
    #[serde(default)]
    pub owner_name: Option<String>,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub access_count: u64,
    #[serde(default)]
    pub failed_access_count: u64,
    pub status: PublicationStatus,
    pub created_at: u64,
    #[serde(default)]
    pub revoked_at: Option<u64>,
}

impl Publication {
    pub fn is_active(&self) -> bool {
        self.status == PublicationStatus::Active
    }
}

/// Public projection of a [`Publication`]: what search and details return.
///
/// Leaves out the fingerprint, the salt, and the KDF parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationSummary {
    pub id: PublicationId,
    pub title: String,
    pub description: String,
    pub domain: String,
    pub keywords: Vec<String>,
    pub content_address: ContentAddress,
    pub owner_id: String,
    pub owner_name: Option<String>,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub access_count: u64,
    pub status: PublicationStatus,
    pub created_at: u64,
}

impl From<&Publication> for PublicationSummary {
    fn from(p: &Publication) -> Self {
        Self {
            id: p.id.clone(),
            title: p.title.clone(),
            description: p.description.clone(),
            domain: p.domain.clone(),
            keywords: p.keywords.clone(),
            content_address: p.content_address.clone(),
            owner_id: p.owner_id.clone(),
            owner_name: p.owner_name.clone(),
            file_name: p.file_name.clone(),
            file_size: p.file_size,
            file_type: p.file_type.clone(),
            access_count: p.access_count,
            status: p.status,
            created_at: p.created_at,
        }
    }
}

/// Default cap on search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Metadata-only search. Never looks at plaintext or ciphertext.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    /// Case-insensitive substring over title, description, domain, keywords
    pub text: Option<String>,
    /// Exact (case-insensitive) domain match
    pub domain: Option<String>,
    /// Matches when the publication carries any of these keywords
    pub keywords: Vec<String>,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn effective_limit(&self, cap: usize) -> usize {
        self.limit.unwrap_or(cap).min(cap)
    }

    /// Whether `publication` satisfies every filter in this query.
    ///
    /// Status is not considered here; registries exclude revoked entries.
    pub fn matches(&self, publication: &Publication) -> bool {
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let hit = publication.title.to_lowercase().contains(&needle)
                || publication.description.to_lowercase().contains(&needle)
                || publication.domain.to_lowercase().contains(&needle)
                || publication
                    .keywords
                    .iter()
                    .any(|k| k.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(domain) = self.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            if !publication.domain.eq_ignore_ascii_case(domain) {
                return false;
            }
        }

        if !self.keywords.is_empty() {
            let any = self.keywords.iter().any(|wanted| {
                publication
                    .keywords
                    .iter()
                    .any(|k| k.eq_ignore_ascii_case(wanted.trim()))
            });
            if !any {
                return false;
            }
        }

        true
    }
}

/// Per-owner aggregate over active publications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerStats {
    pub total_publications: u64,
    pub total_access: u64,
    /// Mean accesses per publication, rounded to two decimals
    pub average_access: f64,
}

impl OwnerStats {
    pub fn from_publications<'a>(publications: impl IntoIterator<Item = &'a Publication>) -> Self {
        let (count, access) = publications
            .into_iter()
            .filter(|p| p.is_active())
            .fold((0u64, 0u64), |(n, a), p| (n + 1, a + p.access_count));

        let average_access = if count > 0 {
            ((access as f64 / count as f64) * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            total_publications: count,
            total_access: access,
            average_access,
        }
    }
}

/// Base64 (standard alphabet) serde adapter for byte fields.
mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(title: &str, domain: &str, keywords: &[&str]) -> Publication {
        Publication {
            id: PublicationId::generate(),
            title: title.into(),
            description: "A study of things".into(),
            domain: domain.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            content_address: ContentAddress::new("blake3:abc"),
            salt: vec![1, 2, 3, 4],
            kdf: KdfSettings::default(),
            key_fingerprint: "00".into(),
            owner_id: "owner-1".into(),
            owner_name: None,
            file_name: "paper.pdf".into(),
            file_size: 10,
            file_type: "application/pdf".into(),
            access_count: 0,
            failed_access_count: 0,
            status: PublicationStatus::Active,
            created_at: 1_700_000_000,
            revoked_at: None,
        }
    }

    #[test]
    fn test_publication_json_roundtrip_keeps_salt() {
        let p = sample("T", "AI", &["ml"]);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"salt\":\"AQIDBA==\""));
        assert!(json.contains("\"status\":\"active\""));
        let back: Publication = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_summary_hides_verification_material() {
        let p = sample("T", "AI", &[]);
        let json = serde_json::to_string(&PublicationSummary::from(&p)).unwrap();
        assert!(!json.contains("key_fingerprint"));
        assert!(!json.contains("salt"));
        assert!(!json.contains("kdf"));
    }

    #[test]
    fn test_publication_id_rejects_blank() {
        assert!("   ".parse::<PublicationId>().is_err());
        let id: PublicationId = "  abc  ".parse().unwrap();
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(
            PublicationMetadata::parse_keywords(" ml, ,vision ,, nlp"),
            vec!["ml", "vision", "nlp"]
        );
        assert!(PublicationMetadata::parse_keywords("").is_empty());
    }

    #[test]
    fn test_search_text_covers_all_metadata_fields() {
        let p = sample("Graph Neural Networks", "AI", &["message-passing"]);
        assert!(SearchQuery::text("neural").matches(&p));
        assert!(SearchQuery::text("study").matches(&p));
        assert!(SearchQuery::text("ai").matches(&p));
        assert!(SearchQuery::text("PASSING").matches(&p));
        assert!(!SearchQuery::text("biology").matches(&p));
        assert!(SearchQuery::text("  ").matches(&p));
    }

    #[test]
    fn test_search_domain_and_keyword_filters() {
        let p = sample("T", "AI", &["ml", "vision"]);

        let q = SearchQuery {
            domain: Some("ai".into()),
            ..Default::default()
        };
        assert!(q.matches(&p));

        let q = SearchQuery {
            domain: Some("Biology".into()),
            ..Default::default()
        };
        assert!(!q.matches(&p));

        let q = SearchQuery {
            keywords: vec!["nlp".into(), "Vision".into()],
            ..Default::default()
        };
        assert!(q.matches(&p));

        let q = SearchQuery {
            keywords: vec!["nlp".into()],
            ..Default::default()
        };
        assert!(!q.matches(&p));
    }

    #[test]
    fn test_effective_limit_is_capped() {
        let q = SearchQuery {
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(q.effective_limit(50), 50);
        assert_eq!(SearchQuery::default().effective_limit(20), 20);
    }

    #[test]
    fn test_owner_stats_ignores_revoked() {
        let mut a = sample("a", "AI", &[]);
        a.access_count = 3;
        let mut b = sample("b", "AI", &[]);
        b.access_count = 4;
        let mut c = sample("c", "AI", &[]);
        c.access_count = 100;
        c.status = PublicationStatus::Revoked;

        let stats = OwnerStats::from_publications([&a, &b, &c]);
        assert_eq!(stats.total_publications, 2);
        assert_eq!(stats.total_access, 7);
        assert_eq!(stats.average_access, 3.5);

        assert_eq!(
            OwnerStats::from_publications(Vec::<&Publication>::new()),
            OwnerStats::default()
        );
    }
}
