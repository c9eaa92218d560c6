//! Fixed lookup tables for enumerated/coded response fields.
//!
//! Unknown codes map to a literal `"Unknown (<code>)"` label rather than
//! being dropped, so undocumented values survive into the record stream.

/// Network registration status (`<stat>` of CREG/CGREG/CEREG).
pub fn registration_status(code: i64) -> String {
    match code {
        0 => "Not registered, not searching".to_string(),
        1 => "Registered, home network".to_string(),
        2 => "Not registered, searching".to_string(),
        3 => "Registration denied".to_string(),
        4 => "Unknown".to_string(),
        5 => "Registered, roaming".to_string(),
        _ => format!("Unknown ({code})"),
    }
}

/// Access technology (`<AcT>` of CREG/COPS family).
pub fn access_technology(code: i64) -> String {
    match code {
        0 => "GSM".to_string(),
        1 => "GSM Compact".to_string(),
        2 => "UTRAN".to_string(),
        3 => "GSM w/EGPRS".to_string(),
        4 => "UTRAN w/HSDPA".to_string(),
        5 => "UTRAN w/HSUPA".to_string(),
        6 => "UTRAN w/HSDPA and HSUPA".to_string(),
        7 => "E-UTRAN".to_string(),
        8 => "E-UTRAN CA".to_string(),
        _ => format!("Unknown ({code})"),
    }
}

/// Functionality level (`<fun>` of CFUN).
pub fn functionality(code: i64) -> String {
    match code {
        0 => "Minimum functionality".to_string(),
        1 => "Full functionality".to_string(),
        4 => "RF disabled (flight mode)".to_string(),
        _ => format!("Unknown ({code})"),
    }
}

/// Operator selection mode (`<mode>` of COPS).
pub fn operator_mode(code: i64) -> String {
    match code {
        0 => "Automatic".to_string(),
        1 => "Manual".to_string(),
        2 => "Deregistered".to_string(),
        3 => "Set format only".to_string(),
        4 => "Manual/automatic".to_string(),
        _ => format!("Unknown ({code})"),
    }
}

/// Packet service attachment state (`<state>` of CGATT).
pub fn attachment(code: i64) -> String {
    match code {
        0 => "Detached".to_string(),
        1 => "Attached".to_string(),
        _ => format!("Unknown ({code})"),
    }
}

/// GNSS engine power state (`<state>` of QGPS).
pub fn gnss_power(code: i64) -> String {
    match code {
        0 => "Off".to_string(),
        1 => "On".to_string(),
        _ => format!("Unknown ({code})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(registration_status(1), "Registered, home network");
        assert_eq!(registration_status(5), "Registered, roaming");
        assert_eq!(access_technology(7), "E-UTRAN");
        assert_eq!(functionality(1), "Full functionality");
        assert_eq!(operator_mode(0), "Automatic");
        assert_eq!(attachment(1), "Attached");
    }

    #[test]
    fn test_unknown_codes_preserved() {
        assert_eq!(access_technology(99), "Unknown (99)");
        assert_eq!(registration_status(11), "Unknown (11)");
        assert_eq!(functionality(7), "Unknown (7)");
        assert_eq!(gnss_power(3), "Unknown (3)");
    }
}
