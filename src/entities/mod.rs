use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel used for visa and region sets that are not restricted.
pub const ALL_TARGETS: &str = "all";

/// Minimum title length (in characters) for a candidate to be persisted.
pub const MIN_TITLE_CHARS: usize = 3;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    #[default]
    Open,
    Closing,
    Upcoming,
    Closed,
}

impl PolicyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Upcoming => "upcoming",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closing" => Ok(Self::Closing),
            "upcoming" => Ok(Self::Upcoming),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown policy status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Success,
    Error,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl FromStr for CrawlStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown crawl status: {other}")),
        }
    }
}

// --- Value types ---

/// A set of visa or region codes, or the unrestricted sentinel `"all"`.
///
/// Serialises as a plain string array (`["all"]` or `["E-9", "H-2"]`) so
/// stored documents stay compatible with array-contains style filters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum Targets {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Targets {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn contains(&self, code: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(codes) => codes.contains(code),
        }
    }

    pub fn codes(&self) -> Vec<String> {
        self.clone().into()
    }
}

impl From<Vec<String>> for Targets {
    fn from(codes: Vec<String>) -> Self {
        let set: BTreeSet<String> = codes
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if set.is_empty() || set.contains(ALL_TARGETS) {
            Self::All
        } else {
            Self::Only(set)
        }
    }
}

impl From<Targets> for Vec<String> {
    fn from(targets: Targets) -> Self {
        match targets {
            Targets::All => vec![ALL_TARGETS.to_string()],
            Targets::Only(codes) => codes.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Translation {
    pub title: String,
    pub summary: String,
    pub content: String,
}

// --- Pipeline records ---

/// The unit produced by extraction and carried through enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCandidate {
    pub external_id: String,
    pub site_id: String,
    pub title: String,
    pub organization: String,
    pub category: String,
    pub status: PolicyStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub target_visa: Targets,
    pub target_region: Targets,
    pub summary: String,
    pub content: String,
    pub original_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub credit_required: bool,
    #[serde(default)]
    pub credit_keywords: Vec<String>,
    #[serde(default)]
    pub translations: BTreeMap<String, Translation>,
}

impl PolicyCandidate {
    /// Skeleton as produced by a list-page extractor. Summary defaults to the
    /// title; classification fields are filled in by the orchestrator.
    pub fn skeleton(
        site_id: impl Into<String>,
        external_id: impl Into<String>,
        title: impl Into<String>,
        original_url: impl Into<String>,
    ) -> Self {
        let title = title.into();
        Self {
            external_id: external_id.into(),
            site_id: site_id.into(),
            summary: title.clone(),
            title,
            organization: String::new(),
            category: String::new(),
            status: PolicyStatus::Open,
            start_date: None,
            end_date: None,
            target_visa: Targets::All,
            target_region: Targets::All,
            content: String::new(),
            original_url: original_url.into(),
            attachments: Vec::new(),
            credit_required: false,
            credit_keywords: Vec::new(),
            translations: BTreeMap::new(),
        }
    }

    /// Title must be non-empty and at least [`MIN_TITLE_CHARS`] characters.
    pub fn has_usable_title(&self) -> bool {
        self.title.trim().chars().count() >= MIN_TITLE_CHARS
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            site_id: self.site_id.clone(),
            title: self.title.clone(),
            start_date: self.start_date,
        }
    }

    /// Copy of this candidate without any translations attached.
    pub fn untranslated(&self) -> Self {
        Self {
            translations: BTreeMap::new(),
            ..self.clone()
        }
    }
}

/// Existence-check key. `start_date` refines the match only when present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub site_id: String,
    pub title: String,
    pub start_date: Option<NaiveDate>,
}

impl DedupKey {
    pub fn matches(&self, policy: &PolicyCandidate) -> bool {
        policy.site_id == self.site_id
            && policy.title == self.title
            && match self.start_date {
                Some(date) => policy.start_date == Some(date),
                None => true,
            }
    }
}

/// A policy as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPolicy {
    pub id: Uuid,
    #[serde(flatten)]
    pub policy: PolicyCandidate,
    pub is_new: bool,
    pub views: i32,
    pub created_at: DateTime<Utc>,
}

/// Equality filters for policy queries. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyFilter {
    pub site_id: Option<String>,
    pub category: Option<String>,
    pub status: Option<PolicyStatus>,
    pub credit_required: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyStats {
    pub total: i64,
    pub new_count: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
}

/// One site-run result. Appended to the crawl log, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlLogEntry {
    pub site_id: String,
    pub site_name: String,
    pub status: CrawlStatus,
    pub total_found: u32,
    pub new_added: u32,
    pub duplicates_skipped: u32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub total_sites: usize,
    pub total_new_added: u32,
    pub results: Vec<CrawlLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerState {
    pub enabled: bool,
    pub morning_schedule: String,
    pub evening_schedule: String,
    pub last_run: Option<DateTime<Utc>>,
}

/// The subset of [`SchedulerState`] that survives a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSchedulerState {
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
}
