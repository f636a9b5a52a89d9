/*!
 * Command Execution
 * Runs a resolved command against the Bluetooth stack and formats output
 */

use std::io::Write;

use crate::bluetooth::{BluetoothService, Device};
use crate::error::CliError;

pub async fn list<S, W>(service: &S, out: &mut W) -> Result<(), CliError>
where
    S: BluetoothService,
    W: Write,
{
    let devices = service
        .list_paired()
        .await?
        .ok_or(CliError::NoPairedDevices)?;

    for device in &devices {
        print_device(out, device)?;
        writeln!(out)?;
    }
    writeln!(out, "Total devices: {}", devices.len())?;

    Ok(())
}

fn print_device<W: Write>(out: &mut W, device: &Device) -> Result<(), CliError> {
    writeln!(out, "Name: {}", device.display_name())?;
    writeln!(
        out,
        "MAC Address: {}",
        device.address.as_deref().unwrap_or("Unknown")
    )?;
    writeln!(out, "Connected: {}", device.connected)?;
    Ok(())
}

pub async fn connect<S, W>(service: &S, out: &mut W, address: &str) -> Result<(), CliError>
where
    S: BluetoothService,
    W: Write,
{
    let device = service
        .resolve(address)
        .await?
        .ok_or_else(|| CliError::DeviceNotFound(address.to_string()))?;

    if !service.is_paired(address).await? {
        return Err(CliError::DeviceNotPaired(address.to_string()));
    }

    // Success is "already connected or the open call went through"; an
    // already-open link reports the same way as a fresh one.
    if service.is_connected(address).await? || service.open_connection(address).await? {
        writeln!(out, "Connected to {}", device.display_name())?;
        Ok(())
    } else {
        Err(CliError::FailedToConnect(address.to_string()))
    }
}

pub async fn disconnect<S, W>(service: &S, out: &mut W, address: &str) -> Result<(), CliError>
where
    S: BluetoothService,
    W: Write,
{
    let device = service
        .resolve(address)
        .await?
        .ok_or_else(|| CliError::DeviceNotFound(address.to_string()))?;

    if !service.is_connected(address).await? {
        writeln!(
            out,
            "Device {} is not connected, nothing to do",
            device.display_name()
        )?;
        return Ok(());
    }

    if service.close_connection(address).await? {
        writeln!(out, "Disconnected from {}", device.display_name())?;
        Ok(())
    } else {
        Err(CliError::FailedToDisconnect(address.to_string()))
    }
}
