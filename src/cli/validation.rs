//! Value parsers for CLI arguments that clap can't check on its own.

use std::net::IpAddr;
use std::path::PathBuf;

/// Longest valid DNS name
const MAX_HOSTNAME_LEN: usize = 253;

/// Parse a TCP port, rejecting 0.
pub fn validate_port(value: &str) -> Result<u16, String> {
    match value.parse::<u16>() {
        Ok(0) => Err("Port must be between 1 and 65535".to_string()),
        Ok(port) => Ok(port),
        Err(_) => Err(format!(
            "Port must be a number between 1 and 65535, got '{}'",
            value
        )),
    }
}

/// Accept a path only if it names a readable regular file.
pub fn validate_config_file_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);

    if !path.is_file() {
        return Err(format!(
            "Configuration file does not exist or is not a file: '{}'",
            value
        ));
    }

    std::fs::File::open(&path)
        .map(|_| path)
        .map_err(|e| format!("Cannot read configuration file '{}': {}", value, e))
}

/// Accept an IP address or a plausible hostname.
///
/// Dotted-decimal input must be a valid IPv4 address; anything else is treated as
/// a hostname and only checked for length and characters.
pub fn validate_host_address(value: &str) -> Result<String, String> {
    let host = value.trim();

    if host.is_empty() {
        return Err("Host address cannot be empty".to_string());
    }

    if host.parse::<IpAddr>().is_ok() {
        return Ok(host.to_string());
    }

    if host.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(format!("Invalid IPv4 address: '{}'", value));
    }

    if host.len() > MAX_HOSTNAME_LEN {
        return Err(format!(
            "Host address is too long (maximum {} characters)",
            MAX_HOSTNAME_LEN
        ));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(format!("Invalid host name: '{}'", value));
    }

    Ok(host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_port_validation() {
        for port in ["1", "80", "8080", "65535"] {
            assert!(validate_port(port).is_ok(), "port {} should be valid", port);
        }
        for port in ["0", "65536", "-1", "abc", ""] {
            assert!(validate_port(port).is_err(), "port '{}' should be invalid", port);
        }
    }

    #[test]
    fn test_host_validation() {
        for host in ["localhost", "127.0.0.1", "0.0.0.0", "::1", "db-01.forest.local"] {
            assert!(validate_host_address(host).is_ok(), "host {} should be valid", host);
        }

        let too_long = "x".repeat(300);
        for host in ["", "   ", "host with spaces", "999.999.999.999", too_long.as_str()] {
            assert!(validate_host_address(host).is_err(), "host '{}' should be invalid", host);
        }
    }

    #[test]
    fn test_config_file_validation() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_config_file_path(dir.path().to_str().unwrap()).is_err());

        let path = dir.path().join("forest.toml");
        assert!(validate_config_file_path(path.to_str().unwrap()).is_err());

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[server]\nport = 9000").unwrap();
        assert_eq!(
            validate_config_file_path(path.to_str().unwrap()).unwrap(),
            path
        );
    }
}
