//! URL Validation
//!
//! Both the page fetcher and the plugin generator take URLs typed by a user.
//! These helpers normalize them and keep requests away from local networks.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::Url;

use eventfinder_core::FetchError;

fn is_reserved_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // carrier-grade NAT, 100.64.0.0/10
        || (a == 100 && (64..128).contains(&b))
}

fn is_reserved_v6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_reserved_v4(mapped);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00 // unique local, fc00::/7
        || (first & 0xffc0) == 0xfe80 // link local, fe80::/10
}

/// Whether `ip` points at this machine or a private network.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_reserved_v4(v4),
        IpAddr::V6(v6) => is_reserved_v6(v6),
    }
}

/// Whether a host name or literal address is local.
pub fn is_private_host(host: &str) -> bool {
    let host = host.trim_matches(|c| c == '[' || c == ']').to_ascii_lowercase();
    let local_name = host == "localhost"
        || [".localhost", ".local", ".internal"]
            .iter()
            .any(|suffix| host.ends_with(suffix));

    local_name || host.parse::<IpAddr>().is_ok_and(is_private_ip)
}

/// Parse a user-supplied URL, assuming `https://` when no scheme is given.
///
/// Only http and https with a non-empty host are accepted.
pub fn normalize_url(input: &str) -> Result<Url, FetchError> {
    let trimmed = input.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(FetchError::InvalidUrl(format!("{}: URL has no host", trimmed)));
    }

    Ok(url)
}

/// Normalize `input` and refuse anything that names or resolves to a local address.
///
/// Every resolved address is checked, so a public name cannot point inward.
pub async fn validate_url_ssrf(input: &str) -> Result<Url, FetchError> {
    let url = normalize_url(input)?;
    let host = url.host_str().unwrap_or_default().to_string();

    if is_private_host(&host) {
        return Err(FetchError::Blocked(format!("private/local address '{}'", host)));
    }

    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|e| FetchError::Network(format!("DNS resolution failed for '{}': {}", host, e)))?;

    if let Some(addr) = addrs.into_iter().find(|addr| is_private_ip(addr.ip())) {
        tracing::warn!("[fetch] Refusing {}: resolves to {}", host, addr.ip());
        return Err(FetchError::Blocked(format!(
            "'{}' resolves to private IP {}",
            host,
            addr.ip()
        )));
    }

    Ok(url)
}
