//! AT command vocabulary, organized into named groups.
//!
//! Group membership and literal command text are configuration data: the
//! executor, parser, and scheduler never assume a particular dialect, so
//! the whole vocabulary can be swapped in the TOML settings without code
//! changes. The built-in defaults target the Quectel EG25 family.
//!
//! ```toml
//! [commands]
//! fast_loop = ["AT+CSQ", "AT+CREG?"]
//! medium_loop = ["AT+COPS?"]
//! slow_loop = ["AT+CCLK?"]
//! ```

use serde::{Deserialize, Serialize};

/// Named command groups: one-time setup and query groups plus the three
/// cadenced polling groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandGroups {
    /// One-time modem configuration writes, run after bootstrap.
    #[serde(default = "default_setup")]
    pub setup: Vec<String>,
    /// One-time queries for static modem/SIM identity.
    #[serde(default = "default_modem_info")]
    pub modem_info: Vec<String>,
    /// One-time queries reading back the GNSS configuration.
    #[serde(default = "default_gnss_info")]
    pub gnss_info: Vec<String>,
    /// One-time queries reading back the network configuration.
    #[serde(default = "default_network_info")]
    pub network_info: Vec<String>,
    /// High-cadence telemetry queries.
    #[serde(default = "default_fast_loop")]
    pub fast_loop: Vec<String>,
    /// Medium-cadence telemetry queries.
    #[serde(default = "default_medium_loop")]
    pub medium_loop: Vec<String>,
    /// Low-cadence telemetry queries.
    #[serde(default = "default_slow_loop")]
    pub slow_loop: Vec<String>,
}

impl Default for CommandGroups {
    fn default() -> Self {
        Self {
            setup: default_setup(),
            modem_info: default_modem_info(),
            gnss_info: default_gnss_info(),
            network_info: default_network_info(),
            fast_loop: default_fast_loop(),
            medium_loop: default_medium_loop(),
            slow_loop: default_slow_loop(),
        }
    }
}

impl CommandGroups {
    /// All groups with their names, in execution order.
    pub fn all(&self) -> [(&'static str, &[String]); 7] {
        [
            ("setup", self.setup.as_slice()),
            ("modem_info", self.modem_info.as_slice()),
            ("gnss_info", self.gnss_info.as_slice()),
            ("network_info", self.network_info.as_slice()),
            ("fast_loop", self.fast_loop.as_slice()),
            ("medium_loop", self.medium_loop.as_slice()),
            ("slow_loop", self.slow_loop.as_slice()),
        ]
    }
}

fn strings(cmds: &[&str]) -> Vec<String> {
    cmds.iter().map(|c| (*c).to_string()).collect()
}

fn default_setup() -> Vec<String> {
    strings(&[
        "AT+CMEE=2",                      // Verbose error reporting
        "AT+CTZU=3",                      // Automatic time zone update via NITZ
        "AT+QFPLMNCFG=\"Delete\",\"all\"", // Clear the forbidden PLMN list
        "AT+QOPSCFG=\"displayrssi\",1",   // RSSI display in operator scans
        "AT+QOPSCFG=\"displaybw\",1",     // Bandwidth display in operator scans
        "AT+QGPSEND",                     // Power off GNSS before configuring it
        "AT+QGPSCFG=\"outport\",\"usbnmea\"",
        "AT+QGPSCFG=\"nmeasrc\",1",
        "AT+QGPSCFG=\"gpsnmeatype\",31",
        "AT+QGPSCFG=\"glonassnmeatype\",7",
        "AT+QGPSCFG=\"galileonmeatype\",1",
        "AT+QGPSCFG=\"beidounmeatype\",3",
        "AT+QGPSCFG=\"gsvextnmeatype\",1",
        "AT+QGPSCFG=\"gnssconfig\",1",
        "AT+QGPSCFG=\"autogps\",1",
        "AT+QGPSCFG=\"agpsposmode\",0",
        "AT+QGPSCFG=\"fixfreq\",10",
        "AT+QGPSCFG=\"1pps\",1",
        "AT+QGPSCFG=\"gnssrawdata\",31,0",
        "AT+QGPS=1",                      // Power GNSS back on
    ])
}

fn default_modem_info() -> Vec<String> {
    strings(&[
        "AT+CGMI",             // Manufacturer
        "AT+CGMM",             // Model
        "AT+CGMR",             // Firmware revision
        "AT+CGSN",             // Serial number / IMEI
        "AT+CPIN?",            // SIM PIN status
        "AT+QCCID",            // SIM ICCID
        "AT+CIMI",             // SIM IMSI
        "AT+QMBNCFG=\"List\"", // Carrier profile list
    ])
}

fn default_gnss_info() -> Vec<String> {
    strings(&[
        "AT+QGPS?",
        "AT+QGPSCFG=\"outport\"",
        "AT+QGPSCFG=\"nmeasrc\"",
        "AT+QGPSCFG=\"gpsnmeatype\"",
        "AT+QGPSCFG=\"glonassnmeatype\"",
        "AT+QGPSCFG=\"galileonmeatype\"",
        "AT+QGPSCFG=\"beidounmeatype\"",
        "AT+QGPSCFG=\"gsvextnmeatype\"",
        "AT+QGPSCFG=\"gnssconfig\"",
        "AT+QGPSCFG=\"autogps\"",
        "AT+QGPSCFG=\"agpsposmode\"",
        "AT+QGPSCFG=\"fixfreq\"",
        "AT+QGPSCFG=\"1pps\"",
        "AT+QGPSCFG=\"gnssrawdata\"",
    ])
}

fn default_network_info() -> Vec<String> {
    strings(&[
        "AT+CTZU?",
        "AT+QCFG=\"band\"",
        "AT+QCFG=\"NWSCANMODE\"",
        "AT+QOPSCFG=\"scancontrol\"",
        "AT+QNWLOCK=\"common/lte\"",
        "AT+QFPLMNCFG=\"list\"",
    ])
}

fn default_fast_loop() -> Vec<String> {
    strings(&[
        "AT+CSQ",                  // Signal quality
        "AT+CREG?",                // GSM network registration
        "AT+CGREG?",               // UMTS network registration
        "AT+CEREG?",               // LTE network registration
        "AT+QCSQ",                 // Extended signal quality
        "AT+QNWINFO",              // Network information
        "AT+QSPN",                 // Service provider name
        "AT+QENG=\"servingcell\"", // Serving cell details
    ])
}

fn default_medium_loop() -> Vec<String> {
    strings(&[
        "AT+CFUN?",                  // Functionality level
        "AT+CGATT?",                 // Packet service attach state
        "AT+COPS?",                  // Current network operator
        "AT+QENG=\"neighbourcell\"", // Neighbour cell list
    ])
}

fn default_slow_loop() -> Vec<String> {
    strings(&[
        "AT+CCLK?",             // Real-time clock
        "AT+QLTS",              // Latest network time sync
        "AT+QGPSGNMEA=\"GGA\"", // One GGA NMEA sentence
        "AT+QGPSGNMEA=\"RMC\"", // One RMC NMEA sentence
    ])
}
