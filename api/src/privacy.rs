use std::net::IpAddr;

pub const MASKED_PLACEHOLDER: &str = "***.***.***.***";

/// Masks an address for display to people other than the site owner.
///
/// IPv4 keeps its first two octets, IPv6 its first four groups. Anything that
/// does not parse as an address becomes `MASKED_PLACEHOLDER`.
pub fn mask_ip(raw: &str) -> String {
    match raw.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            let [a, b, _, _] = v4.octets();
            format!("{a}.{b}.***.***")
        }
        Ok(IpAddr::V6(v6)) => {
            let s = v6.segments();
            format!(
                "{:x}:{:x}:{:x}:{:x}:****:****:****:****",
                s[0], s[1], s[2], s[3]
            )
        }
        Err(_) => MASKED_PLACEHOLDER.to_string(),
    }
}
