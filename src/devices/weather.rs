use crate::session::HiveSession;

/// Outside conditions from the last successful weather fetch.
pub struct Weather<'a> {
    session: &'a HiveSession,
}

impl<'a> Weather<'a> {
    pub(crate) fn new(session: &'a HiveSession) -> Self {
        Weather { session }
    }

    pub fn temperature(&self) -> Option<f64> {
        self.session
            .weather_conditions()?
            .temperature?
            .value
    }

    pub fn unit(&self) -> Option<String> {
        self.session.weather_conditions()?.temperature?.unit
    }

    pub fn description(&self) -> Option<String> {
        self.session.weather_conditions()?.description
    }
}

#[cfg(test)]
mod tests {
    use crate::models::hive::WeatherReport;
    use crate::session::testing::{Harness, at};
    use serde_json::json;

    #[test]
    fn weather_is_rate_limited() {
        let harness = Harness::new(json!([]), json!([]), at("2024-03-04", "12:00"));
        assert_eq!(harness.session.weather().temperature(), None);

        harness.state.borrow_mut().weather = serde_json::from_value::<WeatherReport>(json!({
            "weather": {"description": "Cloudy", "temperature": {"unit": "C", "value": 8.5}}
        }))
        .expect("report");
        assert!(harness.session.refresh_weather_if_due().expect("fetch"));
        let weather = harness.session.weather();
        assert_eq!(weather.temperature(), Some(8.5));
        assert_eq!(weather.unit().as_deref(), Some("C"));
        assert_eq!(weather.description().as_deref(), Some("Cloudy"));

        harness.clock.set(at("2024-03-04", "12:00") + chrono::TimeDelta::seconds(30));
        assert!(!harness.session.refresh_weather_if_due().expect("skipped"));
        harness.clock.set(at("2024-03-04", "12:01"));
        assert!(harness.session.refresh_weather_if_due().expect("fetch"));
    }
}
