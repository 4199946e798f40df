//! Typed journal events.
//!
//! Field names in the journal are PascalCase; each details struct maps only
//! the fields something downstream actually reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::hash::Hash;

use crate::game_data::{EncodedMaterial, ManufacturedMaterial, Material, RawMaterial};

/// One decoded journal record.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEvent {
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl JournalEvent {
    /// The record's `"event"` discriminator.
    pub fn event_name(&self) -> &str {
        self.event.name()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Commander(CommanderDetails),
    Docked(DockedDetails),
    Undocked(UndockedDetails),
    CarrierJumpRequest(CarrierJumpRequestDetails),
    CarrierJump(CarrierJumpDetails),
    CarrierLocation(CarrierLocationDetails),
    CarrierStats(CarrierStatsDetails),
    CarrierJumpCancelled,
    Materials(MaterialsDetails),
    MaterialCollected(MaterialCollectedDetails),
    MaterialTrade(MaterialTradeDetails),
    MissionCompleted(MissionCompletedDetails),
    EngineerCraft(EngineerCraftDetails),
    Bounty(BountyDetails),
    ShipTargeted(ShipTargetedDetails),
    /// Any discriminator this crate does not model, name preserved verbatim.
    Unhandled(String),
}

impl Event {
    pub fn name(&self) -> &str {
        match self {
            Event::Commander(_) => "Commander",
            Event::Docked(_) => "Docked",
            Event::Undocked(_) => "Undocked",
            Event::CarrierJumpRequest(_) => "CarrierJumpRequest",
            Event::CarrierJump(_) => "CarrierJump",
            Event::CarrierLocation(_) => "CarrierLocation",
            Event::CarrierStats(_) => "CarrierStats",
            Event::CarrierJumpCancelled => "CarrierJumpCancelled",
            Event::Materials(_) => "Materials",
            Event::MaterialCollected(_) => "MaterialCollected",
            Event::MaterialTrade(_) => "MaterialTrade",
            Event::MissionCompleted(_) => "MissionCompleted",
            Event::EngineerCraft(_) => "EngineerCraft",
            Event::Bounty(_) => "Bounty",
            Event::ShipTargeted(_) => "ShipTargeted",
            Event::Unhandled(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommanderDetails {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DockedDetails {
    pub station_name: String,
    pub star_system: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UndockedDetails {
    pub station_name: String,
}

// {"timestamp":"2025-03-30T04:03:31Z","event":"CarrierJumpRequest","CarrierID":3700619264,
//  "SystemName":"HD 104785","Body":"HD 104785","SystemAddress":85063078562,"BodyID":0,
//  "DepartureTime":"2025-03-30T04:19:10Z"}
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CarrierJumpRequestDetails {
    #[serde(rename = "DepartureTime")]
    pub departure_time: DateTime<Utc>,
    #[serde(rename = "SystemName")]
    pub system: String,
    #[serde(rename = "Body", default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CarrierJumpDetails {
    #[serde(rename = "StationName", default)]
    pub station_name: Option<String>,
    #[serde(rename = "StarSystem")]
    pub system: String,
    #[serde(rename = "Body")]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CarrierLocationDetails {
    #[serde(rename = "StarSystem")]
    pub system: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CarrierStatsDetails {
    pub name: String,
    pub callsign: String,
    pub fuel_level: i64,
    pub space_usage: SpaceUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpaceUsage {
    pub total_capacity: i64,
    pub crew: i64,
    pub cargo: i64,
    pub cargo_space_reserved: i64,
    pub ship_packs: i64,
    pub module_packs: i64,
    pub free_space: i64,
}

/// Full material inventory, authoritative at the time it is written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MaterialsDetails {
    #[serde(rename = "Raw", deserialize_with = "material_counts")]
    pub raw: HashMap<RawMaterial, i64>,
    #[serde(rename = "Encoded", deserialize_with = "material_counts")]
    pub encoded: HashMap<EncodedMaterial, i64>,
    #[serde(rename = "Manufactured", deserialize_with = "material_counts")]
    pub manufactured: HashMap<ManufacturedMaterial, i64>,
}

/// `[{"Name": .., "Count": ..}, ..]` into a map, typed by category.
fn material_counts<'de, D, M>(deserializer: D) -> Result<HashMap<M, i64>, D::Error>
where
    D: Deserializer<'de>,
    M: Deserialize<'de> + Eq + Hash,
{
    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Entry<M> {
        name: M,
        count: i64,
    }

    let entries = Vec::<Entry<M>>::deserialize(deserializer)?;
    Ok(entries.into_iter().map(|e| (e.name, e.count)).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum MaterialCategory {
    Raw,
    Encoded,
    Manufactured,
}

impl MaterialCategory {
    pub fn of(material: Material) -> Self {
        match material {
            Material::Raw(_) => Self::Raw,
            Material::Encoded(_) => Self::Encoded,
            Material::Manufactured(_) => Self::Manufactured,
        }
    }
}

/// `Category` must agree with the category `Name` resolves to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "CollectedRecord")]
pub struct MaterialCollectedDetails {
    pub category: MaterialCategory,
    pub name: Material,
    pub count: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CollectedRecord {
    category: MaterialCategory,
    name: Material,
    count: i64,
}

impl TryFrom<CollectedRecord> for MaterialCollectedDetails {
    type Error = String;

    fn try_from(record: CollectedRecord) -> Result<Self, Self::Error> {
        let resolved = MaterialCategory::of(record.name);
        if resolved != record.category {
            return Err(format!(
                "material {} is {resolved:?}, record says {:?}",
                record.name.name(),
                record.category
            ));
        }
        Ok(Self {
            category: record.category,
            name: record.name,
            count: record.count,
        })
    }
}

// {"event":"MaterialTrade","MarketID":3230812928,"TraderType":"encoded",
//  "Paid":{"Material":"securityfirmware","Category":"Encoded","Quantity":1},
//  "Received":{"Material":"industrialfirmware","Category":"Encoded","Quantity":3}}
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaterialTradeDetails {
    pub paid: MaterialQuantity,
    pub received: MaterialQuantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaterialQuantity {
    pub material: Material,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MissionCompletedDetails {
    #[serde(rename = "MissionID")]
    pub mission_id: i64,
    #[serde(rename = "MaterialsReward", default)]
    pub materials_reward: Vec<MaterialCount>,
}

/// A `{"Name": .., "Count": ..}` pair naming any material.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaterialCount {
    pub name: Material,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EngineerCraftDetails {
    pub ingredients: Vec<MaterialCount>,
}

// {"event":"Bounty","Rewards":[{"Faction":"Earls of Anana","Reward":19600}],
//  "PilotName":"$npc_name_decorate:#name=Che;","PilotName_Localised":"Che",
//  "Target":"sidewinder","TotalReward":19600,"VictimFaction":"Anana Brotherhood"}
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BountyDetails {
    pub pilot_name: String,
    #[serde(rename = "PilotName_Localised", default)]
    pub pilot_name_localised: Option<String>,
    pub target: String,
    pub total_reward: i64,
    pub victim_faction: String,
}

impl BountyDetails {
    /// Localised pilot name when present, raw name otherwise.
    pub fn display_pilot_name(&self) -> &str {
        self.pilot_name_localised
            .as_deref()
            .unwrap_or(&self.pilot_name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShipTargetedDetails {
    pub target_locked: bool,
    #[serde(default)]
    pub ship: Option<String>,
    #[serde(default)]
    pub bounty: Option<i64>,
    #[serde(default)]
    pub pilot_rank: Option<String>,
    #[serde(default)]
    pub faction: Option<String>,
    #[serde(default)]
    pub legal_status: Option<String>,
}
