use esp_idf_svc::ipv4::IpInfo;
use esp_idf_svc::wifi::*;
use log::info;

use crate::error::{NodeError, Result};

pub struct WifiManager {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiManager {
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self { wifi }
    }

    pub fn connect(&mut self, ssid: &str, password: &str) -> Result<()> {
        let configuration: Configuration = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| NodeError::WifiConnection("Invalid SSID".to_string()))?,
            bssid: None,
            auth_method: AuthMethod::WPA2Personal,
            password: password
                .try_into()
                .map_err(|_| NodeError::WifiConnection("Invalid password".to_string()))?,
            channel: None,
            ..Default::default()
        });

        self.wifi.set_configuration(&configuration)?;

        self.wifi.start()?;
        info!("WiFi started");

        self.wifi.connect()?;
        info!("WiFi connected");

        self.wifi.wait_netif_up()?;
        info!("WiFi netif up");

        Ok(())
    }

    pub fn is_connected(&self) -> Result<bool> {
        Ok(self.wifi.is_connected()?)
    }

    pub fn ip_info(&self) -> Result<IpInfo> {
        Ok(self.wifi.wifi().sta_netif().get_ip_info()?)
    }
}
