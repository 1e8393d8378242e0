//! Hashing System - SHA-256 for export manifests
//!
//! Deterministic hashes: the same template and card always give the same
//! fingerprints, whatever order the JSON keys were written in.

use sha2::{Sha256, Digest};
use serde::Serialize;
use serde_json::{Value, to_string};

use crate::card::CardData;
use crate::templates::Template;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => {
            Value::Array(arr.iter().map(sort_value).collect())
        }
        _ => v.clone()
    }
}

/// Compute manifest hash
pub fn compute_manifest_hash<T: Serialize>(manifest: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(manifest)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Content hash of a template's canvas, card types and layers.
///
/// The id and name are left out so that an imported copy of a template
/// fingerprints the same as its source.
pub fn template_fingerprint(template: &Template) -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Content<'a> {
        canvas: &'a crate::templates::Canvas,
        card_types: &'a [crate::card::CardType],
        layers: &'a [crate::layers::TemplateLayer],
    }
    compute_manifest_hash(&Content {
        canvas: &template.canvas,
        card_types: &template.card_types,
        layers: &template.layers,
    })
}

/// Hash identifying one render: what went in, and which engine drew it.
/// render_hash = sha256(template_fingerprint + canonical_card + engine_version)
pub fn compute_render_hash(
    template_fingerprint: &str,
    card: &CardData,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical_card = canonical_json(card)?;
    let combined = format!("{}:{}:{}", template_fingerprint, canonical_card, engine_version);
    Ok(sha256_hex(combined.as_bytes()))
}

// We need hex encoding
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardType, Rarity};
    use crate::layers::{LayerType, TemplateLayer};
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_hash_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_ignores_identity() {
        let mut a = Template::blank("A");
        a.layers.push(TemplateLayer::with_defaults(LayerType::Rect));
        let mut b = a.clone();
        b.id = "other".into();
        b.name = "B".into();
        assert_eq!(template_fingerprint(&a).unwrap(), template_fingerprint(&b).unwrap());

        b.layers[0].base.x = 1.0;
        assert_ne!(template_fingerprint(&a).unwrap(), template_fingerprint(&b).unwrap());
    }

    #[test]
    fn test_render_hash_tracks_card_and_engine() {
        let card = CardData::new("c1", "Axehand", "Warrior", CardType::Slayer, Rarity::Common);
        let h1 = compute_render_hash("fp", &card, "1.0.0").unwrap();
        assert_eq!(h1, compute_render_hash("fp", &card, "1.0.0").unwrap());
        assert_ne!(h1, compute_render_hash("fp", &card, "1.0.1").unwrap());

        let mut renamed = card.clone();
        renamed.name = "Axehand II".into();
        assert_ne!(h1, compute_render_hash("fp", &renamed, "1.0.0").unwrap());
    }
}
