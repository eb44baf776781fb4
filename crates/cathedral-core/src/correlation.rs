//! Cross-dataset joins over the currently active datasets.
//!
//! Every scan goes through the toggle map first: an inactive dataset is
//! never read, it simply contributes nothing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::catalog::{Catalog, HealingNeedEntry};
use crate::constants::*;
use crate::dataset::DatasetRegistry;
use crate::toggle::ToggleMap;

static HZ_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());

/// How records of one secondary dataset relate to a primary node.
struct JoinSpec {
    dataset: &'static str,
    /// Collection key inside an object-shaped dataset.
    collection: &'static str,
    /// Field added by `resolve_entity`; `None` means correlation-only.
    connection_field: Option<&'static str>,
    /// Record number that node ids fold onto (`((id - 1) % n) + 1`).
    cycle: Option<u32>,
    /// (record field, node field) compared case-insensitively.
    shared: Option<(&'static str, &'static str)>,
    /// Node field naming records explicitly (string or list of strings).
    named_by: &'static str,
}

const JOINS: &[JoinSpec] = &[
    JoinSpec {
        dataset: ANGELS_72,
        collection: "angels",
        connection_field: Some("available_angels"),
        cycle: Some(ANGEL_CYCLE),
        shared: None,
        named_by: "angels",
    },
    JoinSpec {
        dataset: ALCHEMY_OPERATIONS,
        collection: "operations",
        connection_field: Some("alchemy_processes"),
        cycle: None,
        shared: Some(("element", "element")),
        named_by: "alchemy",
    },
    JoinSpec {
        dataset: CRYSTAL_FREQUENCIES,
        collection: "crystals",
        connection_field: Some("resonant_crystals"),
        cycle: None,
        shared: Some(("frequency", "sound")),
        named_by: "crystals",
    },
    JoinSpec {
        dataset: SACRED_GEOMETRY,
        collection: "patterns",
        connection_field: Some("geometric_patterns"),
        cycle: None,
        shared: Some(("frequency", "sound")),
        named_by: "geometry",
    },
    JoinSpec {
        dataset: TAROT_INTEGRATION,
        collection: "cards",
        connection_field: None,
        cycle: None,
        shared: Some(("element", "element")),
        named_by: "tarot",
    },
];

fn join_for(tag: &str) -> Option<&'static JoinSpec> {
    JOINS.iter().find(|j| j.dataset == tag)
}

/// Records of a dataset: the value itself when it is an array, otherwise
/// the array (or map values) under `collection`.
fn records<'a>(dataset: &'a Value, collection: &str) -> Vec<&'a Value> {
    match dataset {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get(collection) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(Value::Object(inner)) => inner.values().collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn text<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

fn same_text(a: Option<&str>, b: &str) -> bool {
    a.is_some_and(|a| a.trim().eq_ignore_ascii_case(b.trim()))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => hz_number(s),
        _ => None,
    }
}

/// Numeric part of a frequency label such as `"528Hz"`.
fn hz_number(label: &str) -> Option<f64> {
    HZ_NUMBER
        .captures(label)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn id_matches(value: &Value, id: u32) -> bool {
    match value {
        Value::Number(n) => n.as_u64() == Some(u64::from(id)),
        Value::String(s) => s.trim().parse::<u32>().ok() == Some(id),
        _ => false,
    }
}

/// Whether a node field names `name`, either as a string or inside a list.
fn names_include(node: &Value, field: &str, name: &str) -> bool {
    match node.get(field) {
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case(name.trim()),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|s| s.trim().eq_ignore_ascii_case(name.trim())),
        _ => false,
    }
}

fn contains_name(list: &[String], name: Option<&str>) -> bool {
    name.is_some_and(|name| list.iter().any(|n| n.eq_ignore_ascii_case(name.trim())))
}

fn push_unique(out: &mut Vec<Value>, record: &Value) {
    if !out.contains(record) {
        out.push(record.clone());
    }
}

/// Result of a healing-need keyword search.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NeedSearch {
    pub entities: Vec<Value>,
    pub angels: Vec<Value>,
    pub alchemy: Vec<Value>,
    pub crystals: Vec<Value>,
}

impl NeedSearch {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.angels.is_empty()
            && self.alchemy.is_empty()
            && self.crystals.is_empty()
    }
}

/// Read-only view joining the registry with the toggle map.
pub struct CorrelationEngine<'a> {
    registry: &'a DatasetRegistry,
    toggles: &'a ToggleMap,
    catalog: &'a Catalog,
}

impl<'a> CorrelationEngine<'a> {
    pub fn new(registry: &'a DatasetRegistry, toggles: &'a ToggleMap, catalog: &'a Catalog) -> Self {
        Self {
            registry,
            toggles,
            catalog,
        }
    }

    /// Dataset body, only while its toggle is on.
    pub fn active_dataset(&self, name: &str) -> Option<&'a Value> {
        if self.toggles.is_active(name) {
            self.registry.get(name)
        } else {
            None
        }
    }

    fn node(&self, id: u32) -> Option<&'a Value> {
        let primary = self.active_dataset(PRIMARY_DATASET)?;
        records(primary, "nodes")
            .into_iter()
            .find(|n| n.get("node_id").is_some_and(|v| id_matches(v, id)))
    }

    /// Look a node up in the primary dataset. With `include_connections`,
    /// the copy carries one extra field per active secondary dataset.
    pub fn resolve_entity(&self, id: u32, include_connections: bool) -> Option<Value> {
        let node = self.node(id)?;
        if !include_connections {
            return Some(node.clone());
        }

        let mut enhanced = node.clone();
        if let Value::Object(fields) = &mut enhanced {
            for join in JOINS {
                let Some(field) = join.connection_field else {
                    continue;
                };
                if !self.toggles.is_active(join.dataset) {
                    continue;
                }
                fields.insert(field.to_string(), Value::Array(self.join(join, id, Some(node))));
            }
        }
        Some(enhanced)
    }

    /// Per-tag join results. Tags without a join are ignored; a tag whose
    /// dataset is inactive or unregistered yields an empty list, as does
    /// every tag when the node itself is absent.
    pub fn correlate(&self, id: u32, tags: &[&str]) -> BTreeMap<String, Vec<Value>> {
        let node = self.node(id);
        let mut out = BTreeMap::new();
        for tag in tags {
            let Some(join) = join_for(tag) else {
                continue;
            };
            out.insert(tag.to_string(), self.join(join, id, node));
        }
        out
    }

    /// `correlate` over every active toggle name.
    pub fn correlate_active(&self, id: u32) -> BTreeMap<String, Vec<Value>> {
        let tags: Vec<&str> = self.toggles.active_names().collect();
        self.correlate(id, &tags)
    }

    fn join(&self, join: &JoinSpec, id: u32, node: Option<&Value>) -> Vec<Value> {
        let (Some(node), Some(dataset)) = (node, self.active_dataset(join.dataset)) else {
            return Vec::new();
        };

        let folded = join.cycle.map(|n| ((id.max(1) - 1) % n) + 1);

        records(dataset, join.collection)
            .into_iter()
            .filter(|record| {
                let listed = record
                    .get("nodes")
                    .and_then(Value::as_array)
                    .is_some_and(|ids| ids.iter().any(|v| id_matches(v, id)));
                let cycled = folded.is_some_and(|n| {
                    record.get("number").is_some_and(|v| id_matches(v, n))
                });
                let shared = join.shared.is_some_and(|(record_field, node_field)| {
                    text(node, node_field).is_some_and(|v| same_text(text(record, record_field), v))
                });
                let named = text(record, "name")
                    .is_some_and(|name| names_include(node, join.named_by, name))
                    || text(record, "key").is_some_and(|key| names_include(node, join.named_by, key));
                listed || cycled || shared || named
            })
            .cloned()
            .collect()
    }

    /// Expand a need keyword into matches across the active datasets.
    /// Unknown keywords return empty lists.
    pub fn search_by_need(&self, term: &str) -> NeedSearch {
        let Some(need) = self.catalog.need(term) else {
            tracing::debug!("no healing-need entry for '{term}'");
            return NeedSearch::default();
        };
        let term = term.trim().to_lowercase();

        NeedSearch {
            entities: self.need_entities(need, &term),
            angels: self.need_angels(need),
            alchemy: self.need_alchemy(need, &term),
            crystals: self.need_crystals(need),
        }
    }

    fn need_entities(&self, need: &HealingNeedEntry, term: &str) -> Vec<Value> {
        let Some(primary) = self.active_dataset(PRIMARY_DATASET) else {
            return Vec::new();
        };
        records(primary, "nodes")
            .into_iter()
            .filter(|node| {
                same_text(text(node, "element"), &need.element)
                    || same_text(text(node, "sound"), &need.frequency)
                    || text(node, "teaching_function")
                        .is_some_and(|f| f.to_lowercase().contains(term))
            })
            .cloned()
            .collect()
    }

    fn need_angels(&self, need: &HealingNeedEntry) -> Vec<Value> {
        let Some(angels) = self.active_dataset(ANGELS_72) else {
            return Vec::new();
        };
        let tone = hz_number(&need.frequency);
        records(angels, "angels")
            .into_iter()
            .filter(|angel| {
                contains_name(&need.angels, text(angel, "name"))
                    || same_text(text(angel, "element"), &need.element)
                    || tone.is_some_and(|hz| {
                        angel
                            .get("toneHz")
                            .and_then(as_number)
                            .is_some_and(|t| (t - hz).abs() < f64::EPSILON)
                    })
            })
            .cloned()
            .collect()
    }

    fn need_alchemy(&self, need: &HealingNeedEntry, term: &str) -> Vec<Value> {
        let Some(alchemy) = self.active_dataset(ALCHEMY_OPERATIONS) else {
            return Vec::new();
        };
        let mut out = Vec::new();

        for operation in records(alchemy, "operations") {
            let key = text(operation, "key").or_else(|| text(operation, "name"));
            if same_text(key, &need.alchemy) {
                push_unique(&mut out, operation);
            }
        }

        if let Some(Value::Object(emotional)) = alchemy.get("emotional_alchemy") {
            for (key, process) in emotional {
                let key_lower = key.to_lowercase();
                if key_lower.contains(term)
                    || key.eq_ignore_ascii_case(&need.alchemy)
                    || same_text(text(process, "frequency"), &need.frequency)
                {
                    push_unique(&mut out, process);
                }
            }
        }
        out
    }

    fn need_crystals(&self, need: &HealingNeedEntry) -> Vec<Value> {
        let Some(crystals) = self.active_dataset(CRYSTAL_FREQUENCIES) else {
            return Vec::new();
        };
        records(crystals, "crystals")
            .into_iter()
            .filter(|c| contains_name(&need.crystals, text(c, "name")))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_shapes() {
        let array = json!([1, 2]);
        assert_eq!(records(&array, "x").len(), 2);
        let object = json!({"x": [1, 2, 3]});
        assert_eq!(records(&object, "x").len(), 3);
        let map = json!({"x": {"a": 1, "b": 2}});
        assert_eq!(records(&map, "x").len(), 2);
        assert!(records(&json!({"y": []}), "x").is_empty());
        assert!(records(&json!("scalar"), "x").is_empty());
    }

    #[test]
    fn test_hz_number() {
        assert_eq!(hz_number("528Hz"), Some(528.0));
        assert_eq!(hz_number("432.5 Hz"), Some(432.5));
        assert_eq!(hz_number("silence"), None);
    }

    #[test]
    fn test_id_matches_number_or_string() {
        assert!(id_matches(&json!(7), 7));
        assert!(id_matches(&json!("7"), 7));
        assert!(!id_matches(&json!(8), 7));
        assert!(!id_matches(&json!(null), 7));
    }

    #[test]
    fn test_names_include() {
        let node = json!({"crystals": ["Amethyst", "Citrine"], "geometry": "Sri Yantra"});
        assert!(names_include(&node, "crystals", "amethyst"));
        assert!(names_include(&node, "geometry", "sri yantra"));
        assert!(!names_include(&node, "crystals", "Hematite"));
        assert!(!names_include(&node, "tarot", "The Fool"));
    }

    #[test]
    fn test_unsupported_tag_has_no_join() {
        assert!(join_for(MYSTERY_HOUSE).is_none());
        assert!(join_for(ANGELS_72).is_some());
    }
}
