//! Snapshot of the latest `/devices` and `/products` listings.
//!
//! Records are grouped by their `type` field and indexed by id once per refresh, so
//! resolvers look records up in constant time.

use crate::models::hive::{DeviceRecord, NodeId};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Device,
    Product,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Hub,
    Thermostat,
    BoilerModule,
    Heating,
    HotWater,
    Plug,
    Light,
    Sensor,
}

pub const LIGHT_TYPES: [&str; 3] = ["warmwhitelight", "tuneablelight", "colourtuneablelight"];
pub const SENSOR_TYPES: [&str; 2] = ["motionsensor", "contactsensor"];

/// Map a raw `type` value onto its category for the given listing.
pub fn classify(source: Source, raw_type: &str) -> Option<Kind> {
    if LIGHT_TYPES.contains(&raw_type) {
        return Some(Kind::Light);
    }
    if SENSOR_TYPES.contains(&raw_type) {
        return Some(Kind::Sensor);
    }
    match (source, raw_type) {
        (_, "activeplug") => Some(Kind::Plug),
        (Source::Device, "hub") => Some(Kind::Hub),
        (Source::Device, "thermostatui") => Some(Kind::Thermostat),
        (Source::Device, "boilermodule") => Some(Kind::BoilerModule),
        (Source::Product, "heating") => Some(Kind::Heating),
        (Source::Product, "hotwater") => Some(Kind::HotWater),
        _ => None,
    }
}

/// Records of one category, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    records: Vec<DeviceRecord>,
    index: HashMap<NodeId, usize>,
}

impl Collection {
    fn push(&mut self, record: DeviceRecord) {
        let Some(id) = record.id.clone() else { return };
        match self.index.get(&id) {
            // duplicate ids: the later record wins
            Some(&pos) => self.records[pos] = record,
            None => {
                self.index.insert(id, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<&DeviceRecord> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    collections: BTreeMap<(Source, Kind), Collection>,
}

/// One exposed entity, as the façade layer would register it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub role: EntityRole,
    pub id: NodeId,
    /// `None` when the entity is the only one of its kind.
    pub name: Option<String>,
    pub device_type: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntityRole {
    HubStatus,
    Heating,
    HotWater,
    BatteryLevel,
    Light,
    Plug,
    BinarySensor,
}

impl Snapshot {
    pub fn from_records(devices: Vec<DeviceRecord>, products: Vec<DeviceRecord>) -> Self {
        let mut snapshot = Snapshot::default();
        for (source, records) in [(Source::Device, devices), (Source::Product, products)] {
            for record in records {
                let Some(kind) = record.r#type.as_deref().and_then(|t| classify(source, t)) else {
                    continue;
                };
                snapshot.collections.entry((source, kind)).or_default().push(record);
            }
        }
        snapshot
    }

    /// Replace categories that are non-empty in `fresh`; empty ones keep their previous records.
    pub fn merge(&mut self, fresh: Snapshot) {
        for (key, collection) in fresh.collections {
            if !collection.is_empty() {
                self.collections.insert(key, collection);
            }
        }
    }

    pub fn collection(&self, source: Source, kind: Kind) -> Option<&Collection> {
        self.collections.get(&(source, kind))
    }

    pub fn product(&self, kind: Kind, id: &NodeId) -> Option<&DeviceRecord> {
        self.collection(Source::Product, kind)?.get(id)
    }

    pub fn device(&self, kind: Kind, id: &NodeId) -> Option<&DeviceRecord> {
        self.collection(Source::Device, kind)?.get(id)
    }

    pub fn products(&self, kind: Kind) -> &[DeviceRecord] {
        self.collection(Source::Product, kind).map(Collection::records).unwrap_or(&[])
    }

    pub fn devices(&self, kind: Kind) -> &[DeviceRecord] {
        self.collection(Source::Device, kind).map(Collection::records).unwrap_or(&[])
    }

    pub fn record_count(&self) -> usize {
        self.collections.values().map(Collection::len).sum()
    }

    /// Enumerate the entities a front end would expose for this snapshot.
    pub fn entities(&self) -> Vec<Entity> {
        let mut out = Vec::new();

        let mut push = |role: EntityRole, record: &DeviceRecord, name: Option<String>| {
            if let (Some(id), Some(device_type)) = (record.id.clone(), record.r#type.clone()) {
                out.push(Entity {
                    role,
                    id,
                    name,
                    device_type,
                });
            }
        };

        for hub in self.devices(Kind::Hub) {
            if let Some(name) = hub.name() {
                push(EntityRole::HubStatus, hub, Some(name.to_string()));
            }
        }

        for (kind, role) in [(Kind::Heating, EntityRole::Heating), (Kind::HotWater, EntityRole::HotWater)] {
            let products = self.products(kind);
            let single = products.len() == 1;
            for product in products {
                if let Some(name) = product.name() {
                    push(role, product, (!single).then(|| name.to_string()));
                }
            }
        }

        let single_thermostat = self.devices(Kind::Thermostat).len() == 1;
        for (kind, device) in self
            .devices(Kind::Thermostat)
            .iter()
            .map(|d| (Kind::Thermostat, d))
            .chain(self.devices(Kind::Sensor).iter().map(|d| (Kind::Sensor, d)))
        {
            if let Some(name) = device.name() {
                let unnamed = kind == Kind::Thermostat && single_thermostat;
                push(EntityRole::BatteryLevel, device, (!unnamed).then(|| name.to_string()));
            }
        }

        for (kind, role) in [
            (Kind::Light, EntityRole::Light),
            (Kind::Plug, EntityRole::Plug),
            (Kind::Sensor, EntityRole::BinarySensor),
        ] {
            for product in self.products(kind) {
                if let Some(name) = product.name() {
                    push(role, product, Some(name.to_string()));
                }
            }
        }

        out
    }
}
