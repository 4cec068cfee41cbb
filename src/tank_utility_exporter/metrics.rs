// tank_utility_exporter - Prometheus metrics exporter for Tank Utility propane monitors
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::poller::Reading;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct DeviceLabels {
    name: String,
}

/// Holder for metrics that can be set from a `Reading`.
///
/// All metrics are created and registered upon call to `TankMetrics::new()`. Each has a
/// "name" label set to the name of the device as configured in the Tank Utility app.
#[derive(Debug, Clone)]
pub struct TankMetrics {
    percentage: Family<DeviceLabels, Gauge<f64, AtomicU64>>,
    temperature: Family<DeviceLabels, Gauge<f64, AtomicU64>>,
    capacity: Family<DeviceLabels, Gauge<f64, AtomicU64>>,
    last_update: Family<DeviceLabels, Gauge<f64, AtomicU64>>,
}

impl TankMetrics {
    /// Create a new `TankMetrics` and register each metric with the provided `Registry`.
    pub fn new(registry: &mut Registry) -> Self {
        let percentage = Family::<DeviceLabels, Gauge<f64, AtomicU64>>::default();
        let temperature = Family::<DeviceLabels, Gauge<f64, AtomicU64>>::default();
        let capacity = Family::<DeviceLabels, Gauge<f64, AtomicU64>>::default();
        let last_update = Family::<DeviceLabels, Gauge<f64, AtomicU64>>::default();

        registry.register(
            "propane_percentage",
            "The percentage remaining reported during the last poll",
            percentage.clone(),
        );
        registry.register(
            "temperature",
            "The temperature reported during the last poll",
            temperature.clone(),
        );
        registry.register("capacity", "The capacity of the tank", capacity.clone());
        registry.register(
            "last_update",
            "The timestamp of the last reading",
            last_update.clone(),
        );

        Self {
            percentage,
            temperature,
            capacity,
            last_update,
        }
    }

    /// Overwrite all metrics for the device the reading belongs to.
    pub fn observe(&self, reading: &Reading) {
        let labels = DeviceLabels {
            name: reading.device_name.clone(),
        };

        self.percentage.get_or_create(&labels).set(reading.tank_percentage);
        self.temperature.get_or_create(&labels).set(reading.temperature);
        self.capacity.get_or_create(&labels).set(reading.capacity as f64);
        self.last_update.get_or_create(&labels).set(reading.observed_at as f64);
    }
}
