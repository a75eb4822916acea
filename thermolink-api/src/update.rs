use core::fmt::Write;
use core::net::Ipv4Addr;

use alloc::string::{String, ToString};
use serde::{Deserialize, Serialize};

use crate::reading::Reading;

/// Channel field numbers for the update request. Channels differ in layout:
/// a bare temperature channel uses field1/field3, a temperature-plus-humidity
/// channel field4/field2/field6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFields {
    pub temperature: u8,
    pub humidity: Option<u8>,
    pub supply: Option<u8>,
}

impl ChannelFields {
    pub fn temperature_only(field: u8) -> Self {
        Self {
            temperature: field,
            humidity: None,
            supply: None,
        }
    }

    pub fn with_humidity(mut self, field: u8) -> Self {
        self.humidity = Some(field);
        self
    }

    pub fn with_supply(mut self, field: u8) -> Self {
        self.supply = Some(field);
        self
    }
}

impl Default for ChannelFields {
    fn default() -> Self {
        Self {
            temperature: 1,
            humidity: None,
            supply: Some(3),
        }
    }
}

/// Write endpoint of a telemetry channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEndpoint {
    pub server: String,
    pub api_key: String,
    pub fields: ChannelFields,
}

impl UpdateEndpoint {
    pub fn new(server: &str, api_key: &str) -> Self {
        Self {
            server: server.to_string(),
            api_key: api_key.to_string(),
            fields: ChannelFields::default(),
        }
    }

    pub fn with_fields(mut self, fields: ChannelFields) -> Self {
        self.fields = fields;
        self
    }

    /// Renders the update request URL:
    /// `http://<server>/update?key=<key>&field<N>=<value>...`, with the
    /// device address appended as a `status` note when one is known.
    pub fn update_url(&self, reading: &Reading, device_ip: Option<Ipv4Addr>) -> String {
        let mut url = String::new();
        let _ = write!(
            url,
            "http://{}/update?key={}&field{}={}",
            self.server, self.api_key, self.fields.temperature, reading.temperature
        );
        if let (Some(field), Some(humidity)) = (self.fields.humidity, reading.humidity) {
            let _ = write!(url, "&field{field}={humidity}");
        }
        if let (Some(field), Some(millivolts)) = (self.fields.supply, reading.supply_millivolts) {
            let _ = write!(url, "&field{field}={millivolts}");
        }
        if let Some(ip) = device_ip {
            let _ = write!(url, "&status=dev_ip:{ip}");
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Centi;

    #[test]
    fn test_temperature_channel_url() {
        let endpoint = UpdateEndpoint::new("184.106.153.149", "CL00000000000000");
        let reading = Reading::new(Centi::from_parts(23, 5), 12_000).with_supply_millivolts(3096);

        let url = endpoint.update_url(&reading, Some(Ipv4Addr::new(192, 168, 1, 42)));

        assert_eq!(
            url,
            "http://184.106.153.149/update?key=CL00000000000000\
             &field1=23.05&field3=3096&status=dev_ip:192.168.1.42"
        );
    }

    #[test]
    fn test_humidity_channel_url() {
        let fields = ChannelFields::temperature_only(4)
            .with_humidity(2)
            .with_supply(6);
        let endpoint = UpdateEndpoint::new("api.thingspeak.com", "KEY").with_fields(fields);
        let reading = Reading::new(Centi::from_parts(-5, 0), 500)
            .with_humidity(Centi::from_parts(48, 20))
            .with_supply_millivolts(2970);

        let url = endpoint.update_url(&reading, None);

        assert_eq!(
            url,
            "http://api.thingspeak.com/update?key=KEY&field4=-5.00&field2=48.20&field6=2970"
        );
    }

    #[test]
    fn test_missing_telemetry_fields_are_omitted() {
        let endpoint = UpdateEndpoint::new("api.thingspeak.com", "KEY");
        let reading = Reading::new(Centi::from_parts(20, 0), 0);

        let url = endpoint.update_url(&reading, None);

        assert_eq!(url, "http://api.thingspeak.com/update?key=KEY&field1=20.00");
    }
}
