// src/generate/network.rs
use chrono::{Duration, NaiveTime};
use rand::{seq::SliceRandom, Rng};
use std::collections::BTreeMap;

use crate::config::Month;

/// Days of flow logs generated per month.
pub const FLOW_DAYS: i64 = 7;
pub const FLOWS_PER_DAY: usize = 100;

const ACCOUNT_ID: &str = "123456789012";
const INTERFACE_ID: &str = "eni-1234567890abcdef0";

/// Private addresses of the resources that sit inside the VPC.
const RESOURCE_ADDRESSES: &[(&str, &str)] = &[
    ("i-1234567890abcdef0", "10.0.1.100"),
    ("i-0987654321fedcba0", "10.0.2.200"),
    ("natgw-1234567890abcdef0", "10.0.1.1"),
    ("igw-1234567890abcdef0", "10.0.0.1"),
    ("eni-1234567890abcdef0", "10.0.1.50"),
];

const EXTERNAL_ADDRESSES: &[&str] = &["203.0.113.1", "198.51.100.1", "192.0.2.1", "8.8.8.8", "1.1.1.1"];

/// TCP, UDP, ICMP.
const PROTOCOLS: &[u8] = &[6, 17, 1];
const DST_PORTS: &[u16] = &[80, 443, 22, 3306, 5432];

pub fn resource_addresses() -> BTreeMap<String, String> {
    RESOURCE_ADDRESSES
        .iter()
        .map(|&(id, ip)| (id.to_string(), ip.to_string()))
        .collect()
}

/// Version 2 default-format flow log lines for the first week of `month`.
pub fn generate_flow_logs<R: Rng + ?Sized>(month: Month, rng: &mut R) -> Vec<String> {
    let internal: Vec<&str> = RESOURCE_ADDRESSES.iter().map(|&(_, ip)| ip).collect();
    let everyone: Vec<&str> = internal
        .iter()
        .chain(EXTERNAL_ADDRESSES.iter())
        .copied()
        .collect();

    let mut lines = Vec::with_capacity(FLOW_DAYS as usize * FLOWS_PER_DAY);
    for offset in 0..FLOW_DAYS {
        let day = month.first_day() + Duration::days(offset);
        let start = day.and_time(NaiveTime::default()).and_utc().timestamp();

        for _ in 0..FLOWS_PER_DAY {
            let mut src = pick(&everyone, rng);
            let mut dst = pick(&everyone, rng);

            // most flows touch at least one of our resources
            if rng.gen_bool(0.6) {
                if rng.gen_bool(0.5) {
                    src = pick(&internal, rng);
                } else {
                    dst = pick(&internal, rng);
                }
            }

            let bytes: u64 = rng.gen_range(1_000..=100_000_000);
            let protocol = PROTOCOLS.choose(rng).copied().unwrap_or(6);
            let src_port: u16 = rng.gen_range(1024..=65535);
            let dst_port = DST_PORTS.choose(rng).copied().unwrap_or(443);
            let packets: u32 = rng.gen_range(1..=100);

            lines.push(format!(
                "2 {ACCOUNT_ID} {INTERFACE_ID} {src} {dst} {src_port} {dst_port} {protocol} {packets} {bytes} {start} {end} ACCEPT OK",
                end = start + 60,
            ));
        }
    }
    lines
}

fn pick<'a, R: Rng + ?Sized>(pool: &[&'a str], rng: &mut R) -> &'a str {
    pool.choose(rng).copied().unwrap_or("0.0.0.0")
}
