use std::time::Duration;

use super::record::SessionRecord;
use crate::sensors::SensorSample;

/// Folds each tick's sample into the live session record
///
/// Humidity is sampled but does not feed any aggregate.
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    tick_period: Duration,
}

impl SessionAggregator {
    pub fn new(tick_period: Duration) -> Self {
        Self { tick_period }
    }

    pub fn apply(&self, record: &mut SessionRecord, sample: &SensorSample) {
        record.ticks += 1;
        record.elapsed += self.tick_period;

        if let Some(temperature) = sample.temperature_c {
            if temperature > record.max_temperature_c {
                record.max_temperature_c = temperature;
            }
        }
    }
}
