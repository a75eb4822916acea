mod error;
mod wifi;

use core::net::Ipv4Addr;

use anyhow::anyhow;
use embassy_time::Duration;
use embedded_svc::http::Method;
use embedded_svc::http::client::Client as HttpClient;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::hal::task::block_on;
use esp_idf_svc::hal::temp_sensor::{TempSensorConfig, TempSensorDriver};
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::info;

use thermolink_api::Centi;
use thermolink_embedded::{
    CycleConfig, Measurement, Node, PowerControl, SampleMode, SensorDriver, StationInterface,
    StationStatus, Transport, UptimeClock, WatchdogPolicy,
};

use crate::error::Result;
use crate::wifi::WifiManager;

const SSID: &str = match option_env!("WIFI_SSID") {
    Some(ssid) => ssid,
    None => "your_wifi_ssid",
};
const PASSWORD: &str = match option_env!("WIFI_PASSWORD") {
    Some(password) => password,
    None => "your_password",
};
const CHANNEL_SERVER: &str = "api.thingspeak.com";
const CHANNEL_API_KEY: &str = match option_env!("CHANNEL_API_KEY") {
    Some(key) => key,
    None => "CHANGE_ME",
};

const SLEEP_MINUTES: u64 = 10;

struct EspStation<'a> {
    wifi: &'a WifiManager,
}

impl StationInterface for EspStation<'_> {
    fn status(&self) -> StationStatus {
        // esp-idf reconnects on its own; anything short of an address is
        // still "connecting" from the cycle's point of view
        match self.wifi.is_connected() {
            Ok(true) => StationStatus::GotIp,
            _ => StationStatus::Connecting,
        }
    }

    fn ip_address(&self) -> Ipv4Addr {
        self.wifi
            .ip_info()
            .map(|info| info.ip)
            .unwrap_or(Ipv4Addr::UNSPECIFIED)
    }
}

struct OnboardSensor {
    driver: TempSensorDriver<'static>,
}

impl SensorDriver for OnboardSensor {
    type Error = esp_idf_svc::sys::EspError;

    fn read(&mut self) -> core::result::Result<Measurement, Self::Error> {
        let celsius = self.driver.get_celsius()?;
        Ok(Measurement::new(Centi::from_celsius(celsius)))
    }
}

struct EspHttpTransport {
    client: HttpClient<EspHttpConnection>,
}

impl Transport for EspHttpTransport {
    type Error = anyhow::Error;

    async fn get(&mut self, url: &str) -> core::result::Result<u16, Self::Error> {
        let request = self
            .client
            .request(Method::Get, url, &[])
            .map_err(|err| anyhow!("request setup failed: {err:?}"))?;
        let response = request
            .submit()
            .map_err(|err| anyhow!("request failed: {err:?}"))?;
        Ok(response.status())
    }
}

struct DeepSleep;

impl PowerControl for DeepSleep {
    type Error = core::convert::Infallible;

    async fn enter_low_power(&mut self, duration: Duration) -> core::result::Result<(), Self::Error> {
        info!("powering down for {} s", duration.as_secs());
        unsafe { esp_idf_svc::sys::esp_deep_sleep(duration.as_micros()) }
    }
}

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs_partition))?,
        sys_loop,
    )?;
    let mut wifi_manager = WifiManager::new(wifi);
    wifi_manager.connect(SSID, PASSWORD)?;

    let mut temp_sensor =
        TempSensorDriver::new(&TempSensorConfig::default(), peripherals.temp_sensor)?;
    temp_sensor.enable()?;

    let http_client = HttpClient::wrap(EspHttpConnection::new(&HttpConfiguration::default())?);

    let config = CycleConfig::new(CHANNEL_SERVER, CHANNEL_API_KEY)
        .with_mode(SampleMode::SingleShot)
        .with_watchdog(60_000, WatchdogPolicy::ForceSleep)
        .with_sleep_duration_ms(SLEEP_MINUTES * 60 * 1_000);

    let mut node = Node::new(
        config,
        EspStation {
            wifi: &wifi_manager,
        },
        OnboardSensor {
            driver: temp_sensor,
        },
        EspHttpTransport {
            client: http_client,
        },
        DeepSleep,
        UptimeClock::new(),
    );

    block_on(node.run())?;
    Ok(())
}
