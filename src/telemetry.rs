//! Running minimum / maximum temperatures per device.

use crate::models::hive::NodeId;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxRecord {
    pub today_min: f64,
    pub today_max: f64,
    pub today_date: NaiveDate,
    /// Extremes since process start; never reset.
    pub restart_min: f64,
    pub restart_max: f64,
}

impl MinMaxRecord {
    fn seeded(temperature: f64, today: NaiveDate) -> Self {
        MinMaxRecord {
            today_min: temperature,
            today_max: temperature,
            today_date: today,
            restart_min: temperature,
            restart_max: temperature,
        }
    }

    fn observe(&mut self, temperature: f64, today: NaiveDate) {
        if today != self.today_date {
            self.today_min = f64::INFINITY;
            self.today_max = f64::NEG_INFINITY;
            self.today_date = today;
        }
        self.today_min = self.today_min.min(temperature);
        self.today_max = self.today_max.max(temperature);
        self.restart_min = self.restart_min.min(temperature);
        self.restart_max = self.restart_max.max(temperature);
    }
}

#[derive(Debug, Default)]
pub struct TemperatureTracker {
    records: HashMap<NodeId, MinMaxRecord>,
}

impl TemperatureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, id: &NodeId, temperature: f64, today: NaiveDate) {
        match self.records.get_mut(id) {
            Some(record) => record.observe(temperature, today),
            None => {
                self.records.insert(id.clone(), MinMaxRecord::seeded(temperature, today));
            }
        }
    }

    pub fn min_max(&self, id: &NodeId) -> Option<MinMaxRecord> {
        self.records.get(id).copied()
    }
}
