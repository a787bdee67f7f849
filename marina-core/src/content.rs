use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A named document driving the editable text and images of one page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteContent {
    pub section: String,
    pub content: Value,
    pub updated_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("Unknown content section: {0}")]
    UnknownSection(String),
    #[error("Content path is empty")]
    EmptyPath,
    #[error("Content path '{0}' has an empty segment")]
    EmptySegment(String),
    #[error("Content at '{0}' is not an object or list")]
    NotAContainer(String),
    #[error("Index {index} is out of bounds at '{at}'")]
    IndexOutOfBounds { at: String, index: String },
    #[error("Content does not match the '{section}' schema: {reason}")]
    SchemaMismatch { section: String, reason: String },
    #[error("Upload rejected: {0}")]
    InvalidUpload(String),
    #[error("Upload rejected: file exceeds {0} bytes")]
    UploadTooLarge(usize),
}

// ============================================================================
// Paths
// ============================================================================

/// Dot-separated address into a content document, e.g. `hero.image` or
/// `images.0.src`. Numeric segments index into lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPath {
    segments: Vec<String>,
}

impl ContentPath {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn label(&self, depth: usize) -> String {
        if depth == 0 {
            "<root>".to_string()
        } else {
            self.segments[..depth].join(".")
        }
    }

    /// Whether any segment names an image field (`image`, `url`, `src`), as in
    /// `hero.image` or `images.0.src`. Uploads may only target these.
    pub fn is_image_slot(&self) -> bool {
        self.segments.iter().any(|s| {
            let s = s.to_ascii_lowercase();
            s.contains("image") || s.contains("url") || s == "src"
        })
    }
}

impl FromStr for ContentPath {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ContentError::EmptyPath);
        }
        let segments: Vec<String> = s.split('.').map(str::to_owned).collect();
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(ContentError::EmptySegment(s.to_string()));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Read the value at `path`, if every step exists.
pub fn get_path<'a>(doc: &'a Value, path: &ContentPath) -> Option<&'a Value> {
    path.segments.iter().try_fold(doc, |node, key| match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Write `value` at `path`. Missing or null intermediate keys become empty
/// objects; list indices must already exist.
pub fn set_path(doc: &mut Value, path: &ContentPath, value: Value) -> Result<(), ContentError> {
    let (last, parents) = path.segments.split_last().ok_or(ContentError::EmptyPath)?;

    if doc.is_null() {
        *doc = Value::Object(Map::new());
    }

    let mut current = doc;
    for (depth, key) in parents.iter().enumerate() {
        current = match current {
            Value::Object(map) => {
                let slot = map.entry(key.clone()).or_insert(Value::Null);
                if slot.is_null() {
                    *slot = Value::Object(Map::new());
                }
                slot
            }
            Value::Array(items) => list_slot(items, key, || path.label(depth))?,
            _ => return Err(ContentError::NotAContainer(path.label(depth))),
        };
    }

    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
        }
        Value::Array(items) => {
            *list_slot(items, last, || path.label(parents.len()))? = value;
        }
        _ => return Err(ContentError::NotAContainer(path.label(parents.len()))),
    }
    Ok(())
}

fn list_slot<'a>(
    items: &'a mut [Value],
    key: &str,
    at: impl Fn() -> String,
) -> Result<&'a mut Value, ContentError> {
    let out_of_bounds = || ContentError::IndexOutOfBounds {
        at: at(),
        index: key.to_string(),
    };
    let index = key.parse::<usize>().map_err(|_| out_of_bounds())?;
    items.get_mut(index).ok_or_else(out_of_bounds)
}

// ============================================================================
// Section schemas
// ============================================================================

/// Page sections with editable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Home,
    Gallery,
    Booking,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Home, Section::Gallery, Section::Booking];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Home => "home",
            Section::Gallery => "gallery",
            Section::Booking => "booking",
        }
    }

    /// Checks that `doc` deserializes into this section's schema.
    pub fn validate(&self, doc: &Value) -> Result<(), ContentError> {
        match self {
            Section::Home => self.check::<HomeContent>(doc),
            Section::Gallery => self.check::<GalleryContent>(doc),
            Section::Booking => self.check::<BookingPageContent>(doc),
        }
    }

    fn check<T: DeserializeOwned>(&self, doc: &Value) -> Result<(), ContentError> {
        T::deserialize(doc)
            .map(|_: T| ())
            .map_err(|e| ContentError::SchemaMismatch {
                section: self.as_str().to_string(),
                reason: e.to_string(),
            })
    }

    /// Built-in copy served before an admin has saved anything.
    pub fn default_document(&self) -> Value {
        let doc = match self {
            Section::Home => serde_json::to_value(HomeContent::default()),
            Section::Gallery => serde_json::to_value(GalleryContent::default()),
            Section::Booking => serde_json::to_value(BookingPageContent::default()),
        };
        doc.unwrap_or(Value::Object(Map::new()))
    }
}

impl FromStr for Section {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| ContentError::UnknownSection(s.to_string()))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HomeContent {
    pub hero: HeroBlock,
    pub features: Vec<Feature>,
    pub call_to_action: CallToAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HeroBlock {
    pub title: String,
    pub subtitle: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Feature {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CallToAction {
    pub title: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryContent {
    pub title: String,
    pub subtitle: String,
    pub images: Vec<GalleryImage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryImage {
    pub src: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BookingPageContent {
    pub title: String,
    pub subtitle: String,
}

impl Default for HomeContent {
    fn default() -> Self {
        Self {
            hero: HeroBlock::default(),
            features: vec![
                Feature {
                    title: "Piscina Infinity".to_string(),
                    description: "Piscina infinity con vista panoramica sul Mar Mediterraneo".to_string(),
                },
                Feature {
                    title: "Design Esclusivo".to_string(),
                    description: "Architettura moderna e minimalista con arredi di lusso".to_string(),
                },
                Feature {
                    title: "Posizione Unica".to_string(),
                    description: "Privacy assoluta a pochi passi dalle spiagge più belle".to_string(),
                },
            ],
            call_to_action: CallToAction::default(),
        }
    }
}

impl Default for HeroBlock {
    fn default() -> Self {
        Self {
            title: "Il Tuo Paradiso Mediterraneo".to_string(),
            subtitle: "Lusso, eleganza e tranquillità in una villa esclusiva con vista mare".to_string(),
            image: None,
        }
    }
}

impl Default for CallToAction {
    fn default() -> Self {
        Self {
            title: "Pronto per la Tua Vacanza da Sogno?".to_string(),
            subtitle: "Prenota ora e vivi un'esperienza indimenticabile nella nostra villa esclusiva".to_string(),
        }
    }
}

impl Default for GalleryContent {
    fn default() -> Self {
        Self {
            title: "Galleria Fotografica".to_string(),
            subtitle: "Scopri ogni angolo della nostra villa di lusso".to_string(),
            images: Vec::new(),
        }
    }
}

impl Default for BookingPageContent {
    fn default() -> Self {
        Self {
            title: "Prenota il Tuo Soggiorno".to_string(),
            subtitle: "Compila il modulo per richiedere la disponibilità. Ti risponderemo entro 24 ore.".to_string(),
        }
    }
}
