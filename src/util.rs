use std::net::{IpAddr, Ipv4Addr};

const NETMON_PORT: &str = "NETMON_PORT";

const DEFAULT_PORT: u16 = 5000;

pub fn get_port() -> u16 {
    parse_port(std::env::var(NETMON_PORT).ok().as_deref())
}

fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|res| res.parse().ok()).unwrap_or(DEFAULT_PORT)
}

const NETMON_ADDR: &str = "NETMON_ADDR";

const DEFAULT_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

pub fn get_addr() -> IpAddr {
    parse_addr(std::env::var(NETMON_ADDR).ok().as_deref())
}

fn parse_addr(raw: Option<&str>) -> IpAddr {
    raw.and_then(|res| res.parse().ok()).unwrap_or(DEFAULT_ADDR)
}

const NETMON_TOKEN: &str = "NETMON_TOKEN";

/// Bearer token for the alert API, unset means no authentication
pub fn get_token() -> Option<String> {
    std::env::var(NETMON_TOKEN).ok().filter(|token| !token.is_empty())
}
