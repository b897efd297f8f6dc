//! Linux sysfs device provider
//!
//! Devices are discovered under `<root>/<bus>/devices/<entry>` (the layout
//! of `/sys/bus`). Each run enumerates every device once, then rescans on a
//! fixed interval and reports whatever appeared, changed or vanished in
//! between. The kernel gives no change notifications for most attributes, so
//! polling is the only complete source.

use crate::provider::{DeviceProvider, FinalStatus, Notification, NotificationSender};
use ahash::AHashMap;
use anyhow::{Context, Result};
use sentry_core::{DeviceKind, DeviceRecord, DeviceUpdate, Properties, PropertyValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Property key holding the bound driver name
pub const DRIVER_KEY: &str = "driver";

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Directory holding one subdirectory per bus (default: /sys/bus)
    pub root: PathBuf,

    /// Buses to watch; empty watches every bus
    pub buses: Vec<String>,

    /// Attribute files read into properties in addition to `uevent`
    pub attributes: Vec<String>,

    /// Rescan interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/sys/bus"),
            buses: vec![],
            attributes: [
                "manufacturer",
                "product",
                "serial",
                "idVendor",
                "idProduct",
                "speed",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            poll_interval_ms: 1000,
        }
    }
}

impl ProviderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Read every device currently present, sorted by id
pub fn scan(config: &ProviderConfig) -> Result<Vec<DeviceRecord>> {
    if !config.root.is_dir() {
        anyhow::bail!("Device root {} is not a directory", config.root.display());
    }

    let mut records = Vec::new();

    for bus_entry in WalkDir::new(&config.root).min_depth(1).max_depth(1) {
        let bus_entry = bus_entry
            .with_context(|| format!("Failed to list buses under {}", config.root.display()))?;
        let bus = bus_entry.file_name().to_string_lossy().into_owned();

        if !config.buses.is_empty() && !config.buses.contains(&bus) {
            continue;
        }

        let devices_dir = bus_entry.path().join("devices");
        if !devices_dir.is_dir() {
            continue;
        }

        for device_entry in WalkDir::new(&devices_dir).min_depth(1).max_depth(1) {
            let device_entry = match device_entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry in {}: {}", devices_dir.display(), e);
                    continue;
                }
            };
            let entry_name = device_entry.file_name().to_string_lossy().into_owned();

            match read_device(&bus, &entry_name, device_entry.path(), &config.attributes) {
                Ok(record) => records.push(record),
                // Devices can vanish between listing and reading.
                Err(e) => debug!("Skipping {}/{}: {}", bus, entry_name, e),
            }
        }
    }

    records.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(records)
}

/// Build a record from one device directory
fn read_device(
    bus: &str,
    entry_name: &str,
    path: &Path,
    attributes: &[String],
) -> Result<DeviceRecord> {
    let mut properties = Properties::default();

    let uevent_path = path.join("uevent");
    if uevent_path.is_file() {
        let uevent = fs::read_to_string(&uevent_path)
            .with_context(|| format!("Failed to read {}", uevent_path.display()))?;
        for (key, value) in parse_uevent(&uevent) {
            properties.insert(key, PropertyValue::Text(value));
        }
    }

    for attribute in attributes {
        let attribute_path = path.join(attribute);
        if !attribute_path.is_file() {
            continue;
        }
        match fs::read(&attribute_path) {
            Ok(bytes) => {
                properties.insert(attribute.clone(), PropertyValue::from_bytes(bytes));
            }
            Err(e) => debug!("Cannot read {}: {}", attribute_path.display(), e),
        }
    }

    if let Ok(target) = fs::read_link(path.join(DRIVER_KEY)) {
        if let Some(driver) = target.file_name() {
            properties.insert(
                DRIVER_KEY.to_string(),
                PropertyValue::Text(driver.to_string_lossy().into_owned()),
            );
        }
    }

    let kind = device_kind(&properties);
    let name = display_name(&properties, entry_name);

    Ok(DeviceRecord {
        id: format!("{}/{}", bus, entry_name),
        kind,
        name,
        properties,
    })
}

/// Parse `KEY=VALUE` lines of a uevent file
fn parse_uevent(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn device_kind(properties: &Properties) -> DeviceKind {
    match properties.get("DEVTYPE") {
        Some(PropertyValue::Text(devtype)) if devtype.ends_with("_interface") => {
            DeviceKind::DeviceInterface
        }
        _ => DeviceKind::Device,
    }
}

fn display_name(properties: &Properties, entry_name: &str) -> String {
    for key in ["product", "NAME", "DEVNAME"] {
        if let Some(PropertyValue::Text(text)) = properties.get(key) {
            let text = text.trim().trim_matches('"');
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }
    entry_name.to_string()
}

/// Notifications turning `previous` into `current`
///
/// Removals come first, then additions and updates, each in id order.
/// Updates carry only the properties whose value differs; keys that
/// disappeared are not reported since the update model has no deletion.
pub fn changes(
    previous: &AHashMap<String, DeviceRecord>,
    current: &AHashMap<String, DeviceRecord>,
) -> Vec<Notification> {
    let mut notifications = Vec::new();

    let mut gone: Vec<&DeviceRecord> = previous
        .values()
        .filter(|record| !current.contains_key(&record.id))
        .collect();
    gone.sort_by(|a, b| a.id.cmp(&b.id));
    for record in gone {
        notifications.push(Notification::Removed(DeviceUpdate::new(
            record.id.clone(),
            record.kind,
        )));
    }

    let mut present: Vec<&DeviceRecord> = current.values().collect();
    present.sort_by(|a, b| a.id.cmp(&b.id));
    for record in present {
        let Some(old) = previous.get(&record.id) else {
            notifications.push(Notification::Added(record.clone()));
            continue;
        };

        let mut update = DeviceUpdate::new(record.id.clone(), record.kind);
        for (key, value) in &record.properties {
            if old.properties.get(key) != Some(value) {
                update.properties.insert(key.clone(), value.clone());
            }
        }

        if !update.properties.is_empty() || old.kind != record.kind {
            notifications.push(Notification::Updated(update));
        }
    }

    notifications
}

fn index(records: Vec<DeviceRecord>) -> AHashMap<String, DeviceRecord> {
    records
        .into_iter()
        .map(|record| (record.id.clone(), record))
        .collect()
}

struct Run {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Polling provider over a sysfs-style tree
pub struct SysfsProvider {
    config: ProviderConfig,
    tx: NotificationSender,
    run: Option<Run>,
}

impl SysfsProvider {
    pub fn new(config: ProviderConfig, tx: NotificationSender) -> Self {
        Self {
            config,
            tx,
            run: None,
        }
    }
}

impl DeviceProvider for SysfsProvider {
    fn start(&mut self) -> Result<()> {
        if let Some(run) = &self.run {
            if !run.handle.is_finished() {
                anyhow::bail!("Provider is already running");
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll(self.config.clone(), self.tx.clone(), cancel.clone()));
        self.run = Some(Run { cancel, handle });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(run) = self.run.take() {
            run.cancel.cancel();
        }
        Ok(())
    }
}

impl Drop for SysfsProvider {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancel.cancel();
        }
    }
}

/// One provider run: enumerate, then rescan until cancelled
async fn poll(config: ProviderConfig, tx: NotificationSender, cancel: CancellationToken) {
    info!(
        "Starting device scan of {} (interval: {:?})",
        config.root.display(),
        config.poll_interval()
    );

    let snapshot = match scan(&config) {
        Ok(records) => records,
        Err(e) => {
            warn!("Initial device scan failed: {:#}", e);
            let _ = tx.send(Notification::Stopped(FinalStatus::Aborted));
            return;
        }
    };

    for record in &snapshot {
        if tx.send(Notification::Added(record.clone())).is_err() {
            return;
        }
    }
    if tx.send(Notification::EnumerationCompleted).is_err() {
        return;
    }

    let mut known = index(snapshot);
    let mut timer = interval(config.poll_interval());
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    timer.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Device scan stopped");
                let _ = tx.send(Notification::Stopped(FinalStatus::Stopped));
                return;
            }
            _ = timer.tick() => {
                let current = match scan(&config) {
                    Ok(records) => index(records),
                    Err(e) => {
                        warn!("Device rescan failed: {:#}", e);
                        let _ = tx.send(Notification::Stopped(FinalStatus::Aborted));
                        return;
                    }
                };

                let notifications = changes(&known, &current);
                if !notifications.is_empty() {
                    debug!("Rescan found {} changes", notifications.len());
                }
                for notification in notifications {
                    if tx.send(notification).is_err() {
                        return;
                    }
                }
                known = current;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider;
    use tempfile::TempDir;

    fn write_device(root: &Path, bus: &str, entry: &str, uevent: &str, product: Option<&str>) -> PathBuf {
        let dir = root.join(bus).join("devices").join(entry);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("uevent"), uevent).unwrap();
        if let Some(product) = product {
            fs::write(dir.join("product"), format!("{}\n", product)).unwrap();
        }
        dir
    }

    fn config(root: &Path) -> ProviderConfig {
        ProviderConfig {
            root: root.to_path_buf(),
            poll_interval_ms: 50,
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_scan_reads_uevent_and_attributes() {
        let temp_dir = TempDir::new().unwrap();
        write_device(
            temp_dir.path(),
            "usb",
            "1-1",
            "DEVTYPE=usb_device\nPRODUCT=46d/c52b/1211\n",
            Some("Unifying Receiver"),
        );
        write_device(
            temp_dir.path(),
            "usb",
            "1-1:1.0",
            "DEVTYPE=usb_interface\nINTERFACE=3/1/1\n",
            None,
        );
        fs::write(
            temp_dir.path().join("usb/devices/1-1/serial"),
            [0x0A_u8, 0xFF],
        )
        .unwrap();

        let records = scan(&config(temp_dir.path())).unwrap();
        assert_eq!(records.len(), 2);

        let device = &records[0];
        assert_eq!(device.id, "usb/1-1");
        assert_eq!(device.kind, DeviceKind::Device);
        assert_eq!(device.name, "Unifying Receiver");
        assert_eq!(device.properties["PRODUCT"], PropertyValue::from("46d/c52b/1211"));
        assert_eq!(device.properties["serial"].render(), "0AFF");

        let interface = &records[1];
        assert_eq!(interface.id, "usb/1-1:1.0");
        assert_eq!(interface.kind, DeviceKind::DeviceInterface);
        assert_eq!(interface.name, "1-1:1.0");
    }

    #[test]
    fn test_scan_filters_buses() {
        let temp_dir = TempDir::new().unwrap();
        write_device(temp_dir.path(), "usb", "1-1", "DEVTYPE=usb_device\n", None);
        write_device(temp_dir.path(), "pci", "0000:00:14.0", "DRIVER=xhci_hcd\n", None);

        let mut config = config(temp_dir.path());
        assert_eq!(scan(&config).unwrap().len(), 2);

        config.buses = vec!["pci".to_string()];
        let records = scan(&config).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "pci/0000:00:14.0");
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir.path().join("nope"));
        assert!(scan(&config).is_err());
    }

    #[test]
    fn test_parse_uevent() {
        let parsed = parse_uevent("MAJOR=189\nDEVNAME=bus/usb/001/002\n\n=bad\nNOEQUALS\n");
        assert_eq!(
            parsed,
            vec![
                ("MAJOR".to_string(), "189".to_string()),
                ("DEVNAME".to_string(), "bus/usb/001/002".to_string()),
            ]
        );
    }

    #[test]
    fn test_changes() {
        let a = DeviceRecord::new("usb/a", DeviceKind::Device, "A").with_property("x", "1");
        let b = DeviceRecord::new("usb/b", DeviceKind::Device, "B").with_property("x", "1");
        let c = DeviceRecord::new("usb/c", DeviceKind::Device, "C");

        let previous = index(vec![a.clone(), b.clone()]);
        let changed_b = b.clone().with_property("x", "2").with_property("y", "new");
        let current = index(vec![changed_b, c.clone()]);

        let notifications = changes(&previous, &current);
        assert_eq!(notifications.len(), 3);
        assert_eq!(
            notifications[0],
            Notification::Removed(DeviceUpdate::new("usb/a", DeviceKind::Device))
        );
        assert_eq!(
            notifications[1],
            Notification::Updated(
                DeviceUpdate::new("usb/b", DeviceKind::Device)
                    .with_property("x", "2")
                    .with_property("y", "new")
            )
        );
        assert_eq!(notifications[2], Notification::Added(c));

        assert!(changes(&current, &current).is_empty());
    }

    async fn next(rx: &mut provider::NotificationReceiver) -> Notification {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_provider_run() {
        let temp_dir = TempDir::new().unwrap();
        let device = write_device(temp_dir.path(), "usb", "1-1", "DEVTYPE=usb_device\n", Some("Hub"));

        let (tx, mut rx) = provider::channel();
        let mut provider = SysfsProvider::new(config(temp_dir.path()), tx);
        provider.start().unwrap();

        match next(&mut rx).await {
            Notification::Added(record) => assert_eq!(record.id, "usb/1-1"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(next(&mut rx).await, Notification::EnumerationCompleted);

        // Replace atomically so a rescan never sees a half-written file.
        fs::write(temp_dir.path().join("product.new"), "Renamed Hub\n").unwrap();
        fs::rename(temp_dir.path().join("product.new"), device.join("product")).unwrap();
        match next(&mut rx).await {
            Notification::Updated(update) => {
                assert_eq!(update.properties["product"], PropertyValue::from("Renamed Hub"));
            }
            other => panic!("unexpected {:?}", other),
        }

        fs::remove_dir_all(&device).unwrap();
        assert_eq!(
            next(&mut rx).await,
            Notification::Removed(DeviceUpdate::new("usb/1-1", DeviceKind::Device))
        );

        provider.stop().unwrap();
        assert_eq!(next(&mut rx).await, Notification::Stopped(FinalStatus::Stopped));
    }

    #[tokio::test]
    async fn test_provider_aborts_when_root_vanishes() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("bus");
        write_device(&root, "usb", "1-1", "DEVTYPE=usb_device\n", None);

        let (tx, mut rx) = provider::channel();
        let mut provider = SysfsProvider::new(config(&root), tx);
        provider.start().unwrap();

        assert!(matches!(next(&mut rx).await, Notification::Added(_)));
        assert_eq!(next(&mut rx).await, Notification::EnumerationCompleted);

        fs::remove_dir_all(&root).unwrap();
        assert_eq!(next(&mut rx).await, Notification::Stopped(FinalStatus::Aborted));
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let temp_dir = TempDir::new().unwrap();
        write_device(temp_dir.path(), "usb", "1-1", "DEVTYPE=usb_device\n", None);

        let (tx, mut rx) = provider::channel();
        let mut provider = SysfsProvider::new(config(temp_dir.path()), tx);

        provider.start().unwrap();
        assert!(provider.start().is_err());
        assert!(matches!(next(&mut rx).await, Notification::Added(_)));
        assert_eq!(next(&mut rx).await, Notification::EnumerationCompleted);
        provider.stop().unwrap();
        assert_eq!(next(&mut rx).await, Notification::Stopped(FinalStatus::Stopped));

        provider.start().unwrap();
        assert!(matches!(next(&mut rx).await, Notification::Added(_)));
        assert_eq!(next(&mut rx).await, Notification::EnumerationCompleted);
    }
}
