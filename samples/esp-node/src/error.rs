use esp_idf_svc::sys::EspError;

#[derive(thiserror::Error, Debug)]
pub enum NodeError {
    #[error("WiFi connection failed: {0}")]
    WifiConnection(String),

    #[error("Cycle error: {0}")]
    Cycle(thermolink_embedded::Error),

    #[error("System error: {0}")]
    System(String),
}

impl From<EspError> for NodeError {
    fn from(err: EspError) -> Self {
        NodeError::System(format!("ESP error: {}", err))
    }
}

impl From<thermolink_embedded::Error> for NodeError {
    fn from(err: thermolink_embedded::Error) -> Self {
        NodeError::Cycle(err)
    }
}

pub type Result<T> = core::result::Result<T, NodeError>;
