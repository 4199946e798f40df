use std::collections::HashMap;

use crate::events::{Event, JournalEvent, MaterialsDetails};
use crate::game_data::{EncodedMaterial, ManufacturedMaterial, Material, RawMaterial};

/// Held quantity per material, one map per category.
///
/// Balances are not clamped: the journal is authoritative even when it is
/// locally inconsistent, so a trade or craft may drive a count below zero
/// until the next `Materials` snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialLedger {
    raw: HashMap<RawMaterial, i64>,
    encoded: HashMap<EncodedMaterial, i64>,
    manufactured: HashMap<ManufacturedMaterial, i64>,
}

impl MaterialLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, material: Material) -> i64 {
        match material {
            Material::Raw(m) => self.raw.get(&m),
            Material::Encoded(m) => self.encoded.get(&m),
            Material::Manufactured(m) => self.manufactured.get(&m),
        }
        .copied()
        .unwrap_or(0)
    }

    /// The single mutation primitive every incremental event goes through.
    /// Saturates at the `i64` bounds.
    pub fn adjust(&mut self, material: Material, delta: i64) {
        let slot = match material {
            Material::Raw(m) => self.raw.entry(m).or_insert(0),
            Material::Encoded(m) => self.encoded.entry(m).or_insert(0),
            Material::Manufactured(m) => self.manufactured.entry(m).or_insert(0),
        };
        *slot = slot.saturating_add(delta);
    }

    /// Replace all three categories with an authoritative snapshot.
    pub fn replace(&mut self, snapshot: &MaterialsDetails) {
        self.raw = snapshot.raw.clone();
        self.encoded = snapshot.encoded.clone();
        self.manufactured = snapshot.manufactured.clone();
    }

    /// Apply a ledger-relevant event. Returns `false` for events that do not
    /// touch materials.
    pub fn apply(&mut self, event: &JournalEvent) -> bool {
        match &event.event {
            Event::Materials(snapshot) => self.replace(snapshot),
            Event::MaterialCollected(details) => self.adjust(details.name, details.count),
            Event::MissionCompleted(details) => {
                for reward in &details.materials_reward {
                    self.adjust(reward.name, reward.count);
                }
            }
            Event::MaterialTrade(details) => {
                self.adjust(details.paid.material, details.paid.quantity.saturating_neg());
                self.adjust(details.received.material, details.received.quantity);
            }
            Event::EngineerCraft(details) => {
                for ingredient in &details.ingredients {
                    self.adjust(ingredient.name, ingredient.count.saturating_neg());
                }
            }
            _ => return false,
        }
        true
    }

    pub fn raw(&self) -> &HashMap<RawMaterial, i64> {
        &self.raw
    }

    pub fn encoded(&self) -> &HashMap<EncodedMaterial, i64> {
        &self.encoded
    }

    pub fn manufactured(&self) -> &HashMap<ManufacturedMaterial, i64> {
        &self.manufactured
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{
        EngineerCraftDetails, MaterialCategory, MaterialCollectedDetails, MaterialCount,
        MaterialQuantity, MaterialTradeDetails, MissionCompletedDetails,
    };
    use chrono::Utc;

    const IRON: Material = Material::Raw(RawMaterial::Iron);
    const FIRMWARE: Material = Material::Encoded(EncodedMaterial::SecurityFirmware);
    const WIRING: Material = Material::Manufactured(ManufacturedMaterial::HeatConductionWiring);

    fn event(event: Event) -> JournalEvent {
        JournalEvent {
            timestamp: Utc::now(),
            event,
        }
    }

    fn snapshot(iron: i64, firmware: i64, wiring: i64) -> JournalEvent {
        event(Event::Materials(MaterialsDetails {
            raw: HashMap::from([(RawMaterial::Iron, iron)]),
            encoded: HashMap::from([(EncodedMaterial::SecurityFirmware, firmware)]),
            manufactured: HashMap::from([(ManufacturedMaterial::HeatConductionWiring, wiring)]),
        }))
    }

    fn collected(material: Material, count: i64) -> JournalEvent {
        event(Event::MaterialCollected(MaterialCollectedDetails {
            category: MaterialCategory::of(material),
            name: material,
            count,
        }))
    }

    #[test]
    fn test_incremental_updates() {
        let mut ledger = MaterialLedger::new();
        assert!(ledger.apply(&collected(IRON, 3)));
        assert!(ledger.apply(&event(Event::MissionCompleted(MissionCompletedDetails {
            mission_id: 1,
            materials_reward: vec![MaterialCount { name: FIRMWARE, count: 4 }],
        }))));
        assert!(ledger.apply(&event(Event::MaterialTrade(MaterialTradeDetails {
            paid: MaterialQuantity { material: FIRMWARE, quantity: 3 },
            received: MaterialQuantity { material: WIRING, quantity: 1 },
        }))));
        assert!(ledger.apply(&event(Event::EngineerCraft(EngineerCraftDetails {
            ingredients: vec![MaterialCount { name: IRON, count: 1 }],
        }))));

        assert_eq!(ledger.balance(IRON), 2);
        assert_eq!(ledger.balance(FIRMWARE), 1);
        assert_eq!(ledger.balance(WIRING), 1);
        assert!(!ledger.apply(&event(Event::CarrierJumpCancelled)));
    }

    #[test]
    fn test_balances_may_go_negative() {
        let mut ledger = MaterialLedger::new();
        ledger.apply(&event(Event::EngineerCraft(EngineerCraftDetails {
            ingredients: vec![MaterialCount { name: WIRING, count: 2 }],
        })));
        assert_eq!(ledger.balance(WIRING), -2);
    }

    #[test]
    fn test_absurd_counts_saturate() {
        let mut ledger = MaterialLedger::new();
        ledger.apply(&collected(IRON, i64::MAX));
        ledger.apply(&collected(IRON, i64::MAX));
        assert_eq!(ledger.balance(IRON), i64::MAX);

        ledger.apply(&event(Event::EngineerCraft(EngineerCraftDetails {
            ingredients: vec![MaterialCount { name: WIRING, count: i64::MIN }],
        })));
        ledger.apply(&event(Event::EngineerCraft(EngineerCraftDetails {
            ingredients: vec![MaterialCount { name: WIRING, count: i64::MAX }],
        })));
        assert_eq!(ledger.balance(WIRING), 0);
    }

    #[test]
    fn test_snapshot_overwrites_history() {
        let histories: Vec<Vec<JournalEvent>> = vec![
            vec![],
            vec![collected(IRON, 50), collected(WIRING, 7)],
            vec![snapshot(1, 2, 3), collected(FIRMWARE, -100)],
            vec![collected(Material::Raw(RawMaterial::Nickel), 9)],
        ];

        for history in histories {
            let mut ledger = MaterialLedger::new();
            for e in &history {
                ledger.apply(e);
            }
            ledger.apply(&snapshot(10, 20, 30));

            assert_eq!(ledger.balance(IRON), 10);
            assert_eq!(ledger.balance(FIRMWARE), 20);
            assert_eq!(ledger.balance(WIRING), 30);
            assert_eq!(ledger.balance(Material::Raw(RawMaterial::Nickel)), 0);
            assert_eq!(ledger.raw().len(), 1);
        }
    }
}
