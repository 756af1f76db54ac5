//! Template Catalog — read-only lookup of meme templates by name.
//!
//! Loaded once at startup (built-in list or a JSON file) and shared behind an
//! `Arc`. Nothing mutates it afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// A single template: provider id plus the number of caption boxes it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    pub name: String,
    /// Imgflip template id.
    pub external_id: u64,
    /// Number of caption boxes. Always ≥ 1.
    pub slot_count: usize,
}

/// Wire shape used by `GET /templates` and by catalog files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateListing {
    pub template_id: u64,
    pub box_count: usize,
}

/// Catalog file contents in document order. Closest-match ties and the
/// prompt's template list both depend on that order.
struct OrderedListing(Vec<(String, TemplateListing)>);

impl<'de> Deserialize<'de> for OrderedListing {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ListingVisitor;

        impl<'de> Visitor<'de> for ListingVisitor {
            type Value = OrderedListing;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of template name to {template_id, box_count}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, listing)) = map.next_entry::<String, TemplateListing>()? {
                    entries.push((name, listing));
                }
                Ok(OrderedListing(entries))
            }
        }

        deserializer.deserialize_map(ListingVisitor)
    }
}

const BUILTIN_TEMPLATES: &[(&str, u64, usize)] = &[
    ("Drake Hotline Bling", 181913649, 2),
    ("Distracted Boyfriend", 112126428, 3),
    ("Two Buttons", 87743020, 3),
    ("Change My Mind", 129242436, 2),
    ("Left Exit 12 Off Ramp", 124822590, 3),
    ("Expanding Brain", 93895088, 4),
    ("This Is Fine", 55311130, 2),
    ("Hide the Pain Harold", 27813981, 2),
    ("UNO Draw 25 Cards", 217743513, 2),
    ("Batman Slapping Robin", 438680, 2),
    ("Woman Yelling At Cat", 188390779, 2),
    ("Running Away Balloon", 131087935, 5),
    ("Gru's Plan", 131940431, 4),
    ("Mocking Spongebob", 102156234, 2),
    ("Is This A Pigeon", 100777631, 3),
    ("Always Has Been", 252600902, 2),
    ("Disaster Girl", 97984, 2),
    ("One Does Not Simply", 61579, 2),
    ("Success Kid", 61544, 2),
    ("Roll Safe Think About It", 89370399, 2),
    ("Surprised Pikachu", 155067746, 3),
    ("Waiting Skeleton", 4087833, 2),
    ("Buff Doge vs. Cheems", 247375501, 4),
    ("Anakin Padme 4 Panel", 322841258, 4),
];

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    entries: Vec<TemplateEntry>,
    index: HashMap<String, usize>,
}

impl TemplateCatalog {
    /// Builds a catalog, rejecting empty lists, zero-box templates and duplicate names.
    pub fn new(entries: Vec<TemplateEntry>) -> Result<Self> {
        if entries.is_empty() {
            bail!("Template catalog must contain at least one template");
        }

        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.slot_count == 0 {
                bail!("Template '{}' has box_count 0", entry.name);
            }
            if index.insert(entry.name.clone(), i).is_some() {
                bail!("Duplicate template name '{}'", entry.name);
            }
        }

        Ok(Self { entries, index })
    }

    pub fn builtin() -> Result<Self> {
        let entries = BUILTIN_TEMPLATES
            .iter()
            .map(|(name, id, boxes)| TemplateEntry {
                name: name.to_string(),
                external_id: *id,
                slot_count: *boxes,
            })
            .collect();
        Self::new(entries)
    }

    /// Parses a catalog in the `{name: {template_id, box_count}}` shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let OrderedListing(listing) =
            serde_json::from_str(json).context("Template catalog is not valid JSON")?;
        Self::new(
            listing
                .into_iter()
                .map(|(name, t)| TemplateEntry {
                    name,
                    external_id: t.template_id,
                    slot_count: t.box_count,
                })
                .collect(),
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template catalog {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("Invalid template catalog {}", path.display()))
    }

    pub fn get(&self, name: &str) -> Option<&TemplateEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolves a possibly-wrong template name to a catalog entry.
    ///
    /// Exact names win. Otherwise picks the template whose lowercased name has
    /// the fewest characters missing from the lowercased input (character-set
    /// difference, not edit distance). Ties go to the earliest template.
    pub fn closest_match(&self, name: &str) -> &TemplateEntry {
        if let Some(entry) = self.get(name) {
            return entry;
        }

        let wanted: HashSet<char> = name.to_lowercase().chars().collect();
        self.entries
            .iter()
            .min_by_key(|entry| {
                entry
                    .name
                    .to_lowercase()
                    .chars()
                    .collect::<HashSet<char>>()
                    .difference(&wanted)
                    .count()
            })
            .unwrap_or(&self.entries[0])
    }

    /// One line per template, as embedded in the caption prompt.
    pub fn render_for_prompt(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("- {} ({} panels)", e.name, e.slot_count))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn listing(&self) -> BTreeMap<String, TemplateListing> {
        self.entries
            .iter()
            .map(|e| {
                (
                    e.name.clone(),
                    TemplateListing {
                        template_id: e.external_id,
                        box_count: e.slot_count,
                    },
                )
            })
            .collect()
    }
}
