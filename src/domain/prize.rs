//! Prize records and identity-set snapshots.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::domain::fields::{pick_text, value_to_text};

const ID_FIELDS: &[&str] = &["id", "_id", "uuid"];
const TITLE_FIELDS: &[&str] = &["title", "name", "type", "reward"];
const AMOUNT_FIELDS: &[&str] = &["amount", "value", "points"];
const TOKEN_FIELDS: &[&str] = &["token", "symbol"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "note"];

/// Identity used to compare snapshots: a stable id when the hub sends one,
/// otherwise the rendered display text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PrizeKey {
    Id(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prize {
    pub key: PrizeKey,
    pub display: String,
    #[serde(skip)]
    pub raw: Value,
}

impl Prize {
    pub fn from_json(raw: Value) -> Self {
        let display = display_text(&raw);
        let key = match pick_text(&raw, ID_FIELDS) {
            Some(id) => PrizeKey::Id(id),
            None => PrizeKey::Text(display.clone()),
        };
        Self { key, display, raw }
    }
}

/// Human-readable prize line.
///
/// `title: amount token`, `amount token`, `title — description`, or `prize`.
pub fn display_text(raw: &Value) -> String {
    if !raw.is_object() {
        return value_to_text(raw);
    }

    let title = pick_text(raw, TITLE_FIELDS).unwrap_or_default();
    let amount = pick_text(raw, AMOUNT_FIELDS).filter(|a| !a.is_empty());
    let token = pick_text(raw, TOKEN_FIELDS).unwrap_or_default();

    if let Some(amount) = amount {
        let main = format!("{amount} {token}").trim().to_string();
        return if title.is_empty() {
            main
        } else {
            format!("{title}: {main}")
        };
    }

    let description = pick_text(raw, DESCRIPTION_FIELDS).unwrap_or_default();
    if title.is_empty() && description.is_empty() {
        return "prize".to_string();
    }
    format!("{title} — {description}")
        .trim_matches(|c| c == ' ' || c == '—')
        .to_string()
}

/// Reward history of one wallet at a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrizeSnapshot {
    pub items: Vec<Prize>,
    /// Total reported by the server (may exceed `items.len()` when capped)
    pub total: u64,
}

impl PrizeSnapshot {
    pub fn new(items: Vec<Prize>, total: u64) -> Self {
        Self { items, total }
    }

    pub fn keys(&self) -> HashSet<&PrizeKey> {
        self.items.iter().map(|p| &p.key).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items of `after` whose identity is absent from `self`, in `after` order.
    pub fn new_since<'a>(&self, after: &'a PrizeSnapshot) -> Vec<&'a Prize> {
        let before = self.keys();
        after
            .items
            .iter()
            .filter(|p| !before.contains(&p.key))
            .collect()
    }
}
