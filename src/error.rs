/*!
 * Command Error Taxonomy
 * Fixed message and exit code for every failure path
 */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("No paired devices found")]
    NoPairedDevices,

    #[error("Device {0} not found")]
    DeviceNotFound(String),

    #[error("Device {0} is not paired")]
    DeviceNotPaired(String),

    #[error("Failed to connect to {0}")]
    FailedToConnect(String),

    #[error("Failed to disconnect from {0}")]
    FailedToDisconnect(String),

    #[error("D-Bus error: {0}")]
    Bus(#[from] dbus::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this failure. Transport failures have no
    /// dedicated code and share the generic one.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::NoPairedDevices => 1,
            CliError::DeviceNotFound(_) => 2,
            CliError::DeviceNotPaired(_) => 3,
            CliError::FailedToConnect(_) => 4,
            CliError::FailedToDisconnect(_) => 5,
            CliError::Bus(_) | CliError::Io(_) => 1,
        }
    }
}
