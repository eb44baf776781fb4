//! Datasets synthesized at controller start from static tables rather than
//! loaded from a source.

use serde_json::{Value, json};

use crate::constants::*;

fn sacred_geometry() -> Value {
    json!({
        "patterns": [
            { "name": "Flower of Life", "healing": "overall harmony", "frequency": "528Hz" },
            { "name": "Metatron's Cube", "healing": "protection", "frequency": "741Hz" },
            { "name": "Sri Yantra", "healing": "manifestation", "frequency": "852Hz" },
            { "name": "Seed of Life", "healing": "new beginnings", "frequency": "396Hz" },
            { "name": "Vesica Piscis", "healing": "union", "frequency": "639Hz" },
            { "name": "Torus", "healing": "self-sustaining flow", "frequency": "417Hz" },
        ]
    })
}

fn crystal_frequencies() -> Value {
    json!({
        "crystals": [
            { "name": "Clear Quartz", "frequency": "963Hz", "chakra": "Crown", "healing": "amplification" },
            { "name": "Rose Quartz", "frequency": "639Hz", "chakra": "Heart", "healing": "love_healing" },
            { "name": "Amethyst", "frequency": "852Hz", "chakra": "Third Eye", "healing": "intuition" },
            { "name": "Lepidolite", "frequency": "528Hz", "chakra": "Heart", "healing": "calm" },
            { "name": "Blue Lace Agate", "frequency": "741Hz", "chakra": "Throat", "healing": "gentle expression" },
            { "name": "Sunstone", "frequency": "417Hz", "chakra": "Sacral", "healing": "joy" },
            { "name": "Citrine", "frequency": "528Hz", "chakra": "Solar Plexus", "healing": "confidence" },
            { "name": "Black Tourmaline", "frequency": "396Hz", "chakra": "Root", "healing": "protection" },
            { "name": "Smoky Quartz", "frequency": "396Hz", "chakra": "Root", "healing": "grounding" },
            { "name": "Hematite", "frequency": "396Hz", "chakra": "Root", "healing": "stability" },
        ]
    })
}

fn chakra_system() -> Value {
    json!({
        "chakras": [
            { "name": "Root", "frequency": "396Hz", "element": "Earth", "color": "red" },
            { "name": "Sacral", "frequency": "417Hz", "element": "Water", "color": "orange" },
            { "name": "Solar Plexus", "frequency": "528Hz", "element": "Fire", "color": "yellow" },
            { "name": "Heart", "frequency": "639Hz", "element": "Air", "color": "green" },
            { "name": "Throat", "frequency": "741Hz", "element": "Ether", "color": "blue" },
            { "name": "Third Eye", "frequency": "852Hz", "element": "Light", "color": "indigo" },
            { "name": "Crown", "frequency": "963Hz", "element": "Thought", "color": "violet" },
        ]
    })
}

const MAJOR_ARCANA: &[(&str, &str)] = &[
    ("The Fool", "Air"),
    ("The Magician", "Air"),
    ("The High Priestess", "Water"),
    ("The Empress", "Earth"),
    ("The Emperor", "Fire"),
    ("The Hierophant", "Earth"),
    ("The Lovers", "Air"),
    ("The Chariot", "Water"),
    ("Strength", "Fire"),
    ("The Hermit", "Earth"),
    ("Wheel of Fortune", "Fire"),
    ("Justice", "Air"),
    ("The Hanged Man", "Water"),
    ("Death", "Water"),
    ("Temperance", "Fire"),
    ("The Devil", "Earth"),
    ("The Tower", "Fire"),
    ("The Star", "Air"),
    ("The Moon", "Water"),
    ("The Sun", "Fire"),
    ("Judgement", "Fire"),
    ("The World", "Earth"),
];

fn tarot_integration() -> Value {
    let cards: Vec<Value> = MAJOR_ARCANA
        .iter()
        .enumerate()
        .map(|(number, (name, element))| {
            json!({ "number": number, "name": name, "element": element, "arcana": "major" })
        })
        .collect();
    json!({ "cards": cards })
}

fn daemon_guardians() -> Value {
    json!({
        "guardians": [
            { "name": "Keeper of the Threshold", "element": "Earth", "shadow_aspect": "fear of change" },
            { "name": "Warden of Tides", "element": "Water", "shadow_aspect": "grief held too long" },
            { "name": "Sentinel of Embers", "element": "Fire", "shadow_aspect": "anger turned inward" },
            { "name": "Watcher of Winds", "element": "Air", "shadow_aspect": "restless thought" },
        ]
    })
}

fn tara_overlays() -> Value {
    json!({
        "taras": [
            { "name": "Green Tara", "quality": "swift compassion", "color": "green" },
            { "name": "White Tara", "quality": "longevity and serenity", "color": "white" },
            { "name": "Red Tara", "quality": "magnetizing courage", "color": "red" },
            { "name": "Blue Tara", "quality": "transforming anger", "color": "blue" },
            { "name": "Yellow Tara", "quality": "abundance", "color": "yellow" },
        ]
    })
}

fn reiki_symbols() -> Value {
    json!({
        "symbols": [
            { "name": "Cho Ku Rei", "purpose": "power and protection" },
            { "name": "Sei He Ki", "purpose": "emotional healing" },
            { "name": "Hon Sha Ze Sho Nen", "purpose": "distance healing" },
            { "name": "Dai Ko Myo", "purpose": "master integration" },
        ]
    })
}

/// Every synthesized dataset, keyed by its registry name.
pub fn synthesized() -> Vec<(&'static str, Value)> {
    vec![
        (SACRED_GEOMETRY, sacred_geometry()),
        (CRYSTAL_FREQUENCIES, crystal_frequencies()),
        (CHAKRA_SYSTEM, chakra_system()),
        (TAROT_INTEGRATION, tarot_integration()),
        (DAEMON_GUARDIANS, daemon_guardians()),
        (TARA_OVERLAYS, tara_overlays()),
        (REIKI_SYMBOLS, reiki_symbols()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_is_non_empty() {
        for (name, value) in synthesized() {
            let object = value.as_object().unwrap();
            assert_eq!(object.len(), 1, "{name} should hold one collection");
            let records = object.values().next().unwrap().as_array().unwrap();
            assert!(!records.is_empty(), "{name} has no records");
        }
    }

    #[test]
    fn test_tarot_numbers_follow_order() {
        let tarot = tarot_integration();
        let cards = tarot["cards"].as_array().unwrap();
        assert_eq!(cards.len(), 22);
        assert_eq!(cards[0]["name"], "The Fool");
        assert_eq!(cards[21]["number"], 21);
    }
}
