/*!
 * Bluetooth Device Management
 * Paired device lookup and connection via BlueZ D-Bus
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dbus::arg::{prop_cast, PropMap};
use dbus::nonblock::stdintf::org_freedesktop_dbus::{ObjectManager, Properties};
use dbus::nonblock::{Proxy, SyncConnection};
use dbus::Path;

use crate::config::Config;
use crate::error::CliError;

const BLUEZ_SERVICE: &str = "org.bluez";
const ADAPTER_IFACE: &str = "org.bluez.Adapter1";
const DEVICE_IFACE: &str = "org.bluez.Device1";

/// Read-only snapshot of a device known to the Bluetooth stack.
#[derive(Debug, Clone)]
pub struct Device {
    pub name: Option<String>,
    pub address: Option<String>,
    pub paired: bool,
    pub connected: bool,
}

impl Device {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// Capability surface of the host Bluetooth stack.
///
/// Commands run against this trait so tests can substitute an in-memory
/// device registry for the system bus.
pub trait BluetoothService {
    /// All paired devices, or `None` when the stack itself is unavailable
    /// (no adapter present). `Some(vec![])` is a valid zero-device result.
    async fn list_paired(&self) -> Result<Option<Vec<Device>>, CliError>;

    /// Snapshot of the device with the given MAC address, matched
    /// case-insensitively.
    async fn resolve(&self, address: &str) -> Result<Option<Device>, CliError>;

    async fn is_paired(&self, address: &str) -> Result<bool, CliError>;

    async fn is_connected(&self, address: &str) -> Result<bool, CliError>;

    /// Attempts to open a connection. `Ok(false)` means the stack refused
    /// the request, not that the bus transport broke.
    async fn open_connection(&self, address: &str) -> Result<bool, CliError>;

    async fn close_connection(&self, address: &str) -> Result<bool, CliError>;
}

pub struct BluezClient {
    conn: Arc<SyncConnection>,
    timeout: Duration,
    adapter: Option<String>,
}

impl BluezClient {
    pub async fn new(config: &Config) -> Result<Self, CliError> {
        let (resource, conn) = dbus_tokio::connection::new_system_sync()?;

        // The resource task drives all I/O on the connection; it only
        // resolves if the bus connection is lost.
        tokio::spawn(async {
            let err = resource.await;
            tracing::error!("Lost connection to D-Bus: {}", err);
        });

        Ok(Self {
            conn,
            timeout: Duration::from_secs(config.dbus_timeout_secs),
            adapter: config.adapter.clone(),
        })
    }

    fn proxy(&self, path: Path<'static>) -> Proxy<'static, Arc<SyncConnection>> {
        Proxy::new(BLUEZ_SERVICE, path, self.timeout, self.conn.clone())
    }

    async fn managed_objects(
        &self,
    ) -> Result<HashMap<Path<'static>, HashMap<String, PropMap>>, CliError> {
        let objects = self.proxy(Path::from("/")).get_managed_objects().await?;
        Ok(objects)
    }

    fn under_adapter(&self, path: &Path<'_>) -> bool {
        under_adapter(self.adapter.as_deref(), path)
    }

    async fn device_path(&self, address: &str) -> Result<Option<Path<'static>>, CliError> {
        let objects = self.managed_objects().await?;
        for (path, interfaces) in objects {
            if !self.under_adapter(&path) {
                continue;
            }
            let Some(props) = interfaces.get(DEVICE_IFACE) else {
                continue;
            };
            if let Some(addr) = prop_cast::<String>(props, "Address") {
                if addr.eq_ignore_ascii_case(address) {
                    return Ok(Some(path));
                }
            }
        }
        Ok(None)
    }

    async fn device_property(&self, address: &str, name: &str) -> Result<bool, CliError> {
        let path = self
            .device_path(address)
            .await?
            .ok_or_else(|| CliError::DeviceNotFound(address.to_string()))?;
        Ok(self.proxy(path).get::<bool>(DEVICE_IFACE, name).await?)
    }

    async fn call_device(&self, address: &str, method: &str) -> Result<bool, CliError> {
        let path = self
            .device_path(address)
            .await?
            .ok_or_else(|| CliError::DeviceNotFound(address.to_string()))?;
        match self
            .proxy(path)
            .method_call::<(), _, _, _>(DEVICE_IFACE, method, ())
            .await
        {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::debug!("{} on {} failed: {}", method, address, e);
                Ok(false)
            }
        }
    }
}

/// True unless `adapter` pins an adapter the object does not belong to.
/// Matches the whole path component, so pinning "hci1" does not capture
/// "hci10" objects.
fn under_adapter(adapter: Option<&str>, path: &Path<'_>) -> bool {
    match adapter {
        Some(adapter) => path
            .strip_prefix(&format!("/org/bluez/{}", adapter))
            .map(|rest| rest.is_empty() || rest.starts_with('/'))
            .unwrap_or(false),
        None => true,
    }
}

fn device_from_props(props: &PropMap) -> Device {
    Device {
        name: prop_cast::<String>(props, "Name").cloned(),
        address: prop_cast::<String>(props, "Address").cloned(),
        paired: prop_cast::<bool>(props, "Paired").copied().unwrap_or(false),
        connected: prop_cast::<bool>(props, "Connected")
            .copied()
            .unwrap_or(false),
    }
}

impl BluetoothService for BluezClient {
    async fn list_paired(&self) -> Result<Option<Vec<Device>>, CliError> {
        let objects = self.managed_objects().await?;

        let adapter_present = objects.iter().any(|(path, interfaces)| {
            self.under_adapter(path) && interfaces.contains_key(ADAPTER_IFACE)
        });
        if !adapter_present {
            return Ok(None);
        }

        let mut devices: Vec<Device> = objects
            .iter()
            .filter(|(path, _)| self.under_adapter(path))
            .filter_map(|(_, interfaces)| interfaces.get(DEVICE_IFACE))
            .map(device_from_props)
            .filter(|device| device.paired)
            .collect();
        // GetManagedObjects hands back a hash map; keep the listing stable
        devices.sort_by(|a, b| a.address.cmp(&b.address));

        Ok(Some(devices))
    }

    async fn resolve(&self, address: &str) -> Result<Option<Device>, CliError> {
        let objects = self.managed_objects().await?;
        for (path, interfaces) in &objects {
            if !self.under_adapter(path) {
                continue;
            }
            let Some(props) = interfaces.get(DEVICE_IFACE) else {
                continue;
            };
            let matches = prop_cast::<String>(props, "Address")
                .map(|addr| addr.eq_ignore_ascii_case(address))
                .unwrap_or(false);
            if matches {
                return Ok(Some(device_from_props(props)));
            }
        }
        Ok(None)
    }

    async fn is_paired(&self, address: &str) -> Result<bool, CliError> {
        self.device_property(address, "Paired").await
    }

    async fn is_connected(&self, address: &str) -> Result<bool, CliError> {
        self.device_property(address, "Connected").await
    }

    async fn open_connection(&self, address: &str) -> Result<bool, CliError> {
        self.call_device(address, "Connect").await
    }

    async fn close_connection(&self, address: &str) -> Result<bool, CliError> {
        self.call_device(address, "Disconnect").await
    }
}
