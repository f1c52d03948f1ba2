// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// mDNS advertisement of the relay as `_photoprint._tcp.local.`.
//
// The TXT record carries the default printer and the known printer list as
// seen at registration time.  Advertising is best-effort: failures are logged
// and the HTTP service keeps running without it.

use mdns_sd::{ServiceDaemon, ServiceInfo};
use tracing::{info, warn};

use photoprint_core::error::{PhotoprintError, Result};
use photoprint_core::types::{AdvertiseStatus, PrinterInventorySnapshot};

/// DNS-SD service type clients browse for.
pub const PHOTOPRINT_SERVICE_TYPE: &str = "_photoprint._tcp.local.";

/// Longest `printers` TXT value we publish. A single TXT string is capped at
/// 255 bytes including the key.
const MAX_PRINTERS_TXT: usize = 200;

/// TXT properties for a snapshot, in publication order.
pub fn txt_properties(
    snapshot: &PrinterInventorySnapshot,
    default_printer: Option<&str>,
    version: &str,
) -> Vec<(String, String)> {
    let default = default_printer
        .or(snapshot.default_printer.as_deref())
        .unwrap_or("default");
    vec![
        ("defaultPrinter".into(), default.into()),
        (
            "printers".into(),
            truncate_on_char_boundary(&snapshot.known_printers.join(","), MAX_PRINTERS_TXT),
        ),
        ("version".into(), version.into()),
    ]
}

fn truncate_on_char_boundary(value: &str, max: usize) -> String {
    if value.len() <= max {
        return value.to_string();
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// Owns the mDNS daemon while the relay is advertised.
pub struct ServiceAdvertiser {
    instance_name: String,
    port: u16,
    daemon: Option<ServiceDaemon>,
    fullname: Option<String>,
    status: AdvertiseStatus,
}

impl ServiceAdvertiser {
    pub fn new(instance_name: impl Into<String>, port: u16) -> Self {
        Self {
            instance_name: instance_name.into(),
            port,
            daemon: None,
            fullname: None,
            status: AdvertiseStatus::Stopped,
        }
    }

    pub fn status(&self) -> AdvertiseStatus {
        self.status
    }

    /// Publish the service with `properties` as its TXT record.
    pub fn register(&mut self, properties: &[(String, String)]) -> AdvertiseStatus {
        if self.daemon.is_some() {
            return self.status;
        }

        self.status = match self.try_register(properties) {
            Ok(()) => {
                info!(
                    service_type = PHOTOPRINT_SERVICE_TYPE,
                    name = %self.instance_name,
                    port = self.port,
                    "mDNS service registered"
                );
                AdvertiseStatus::Registered
            }
            Err(e) => {
                warn!(error = %e, "mDNS advertisement unavailable");
                AdvertiseStatus::Error
            }
        };
        self.status
    }

    fn try_register(&mut self, properties: &[(String, String)]) -> Result<()> {
        let service_info = self.service_info(properties)?;
        let daemon = ServiceDaemon::new()
            .map_err(|e| PhotoprintError::Discovery(format!("mDNS daemon: {e}")))?;
        let fullname = service_info.get_fullname().to_owned();
        let registered = daemon
            .register(service_info)
            .map_err(|e| PhotoprintError::Discovery(format!("register {fullname}: {e}")));
        // Keep the daemon either way so `unregister` shuts it down.
        self.daemon = Some(daemon);
        registered?;
        self.fullname = Some(fullname);
        Ok(())
    }

    fn service_info(&self, properties: &[(String, String)]) -> Result<ServiceInfo> {
        let txt: Vec<(&str, &str)> = properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "photoprint".into());

        ServiceInfo::new(
            PHOTOPRINT_SERVICE_TYPE,
            &self.instance_name,
            &format!("{hostname}.local."),
            "",
            self.port,
            &txt[..],
        )
        .map(ServiceInfo::enable_addr_auto)
        .map_err(|e| PhotoprintError::Discovery(format!("service info: {e}")))
    }

    /// Withdraw the record and stop the daemon.
    pub fn unregister(&mut self) {
        if let Some(daemon) = self.daemon.take() {
            if let Some(fullname) = self.fullname.take() {
                match daemon.unregister(&fullname) {
                    Ok(_) => info!(name = %fullname, "mDNS service unregistered"),
                    Err(e) => warn!(error = %e, "failed to unregister mDNS service"),
                }
            }
            if let Err(e) = daemon.shutdown() {
                warn!(error = %e, "failed to shut down mDNS daemon");
            }
        }
        self.status = AdvertiseStatus::Stopped;
    }
}

impl Drop for ServiceAdvertiser {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(props: &'a [(String, String)], key: &str) -> &'a str {
        props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap()
    }

    #[test]
    fn txt_record_lists_default_and_printers() {
        let snap = PrinterInventorySnapshot::new(
            Some("DNP_DS620".into()),
            vec!["DNP_DS620".into(), "Office".into()],
        );
        let props = txt_properties(&snap, None, "0.1.0");
        assert_eq!(value(&props, "defaultPrinter"), "DNP_DS620");
        assert_eq!(value(&props, "printers"), "DNP_DS620,Office");
        assert_eq!(value(&props, "version"), "0.1.0");
    }

    #[test]
    fn override_and_missing_default() {
        let snap = PrinterInventorySnapshot::empty();
        assert_eq!(value(&txt_properties(&snap, None, "1"), "defaultPrinter"), "default");
        assert_eq!(
            value(&txt_properties(&snap, Some("Kiosk"), "1"), "defaultPrinter"),
            "Kiosk"
        );
        assert_eq!(value(&txt_properties(&snap, None, "1"), "printers"), "");
    }

    #[test]
    fn long_printer_list_is_truncated_on_char_boundary() {
        let names: Vec<String> = (0..40).map(|i| format!("Drucker-{i}-ü")).collect();
        let snap = PrinterInventorySnapshot::new(None, names);
        let printers = value(&txt_properties(&snap, None, "1"), "printers").to_string();
        assert!(printers.len() <= MAX_PRINTERS_TXT);
        assert!(printers.starts_with("Drucker-0-ü,"));
    }

    #[test]
    fn new_advertiser_is_stopped() {
        let mut adv = ServiceAdvertiser::new("Photoprint Relay", 3000);
        assert_eq!(adv.status(), AdvertiseStatus::Stopped);
        adv.unregister();
        assert_eq!(adv.status(), AdvertiseStatus::Stopped);
    }

    #[test]
    fn invalid_txt_key_is_a_discovery_error() {
        let mut adv = ServiceAdvertiser::new("Photoprint Test", 3000);
        let props = vec![("bad=key".to_string(), "x".to_string())];

        let err = adv.service_info(&props).unwrap_err();
        assert!(matches!(err, PhotoprintError::Discovery(_)));

        assert_eq!(adv.register(&props), AdvertiseStatus::Error);
        assert_eq!(adv.status(), AdvertiseStatus::Error);
        assert!(adv.daemon.is_none());
        adv.unregister();
        assert_eq!(adv.status(), AdvertiseStatus::Stopped);
    }
}
