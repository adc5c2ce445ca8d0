use crate::model::Operation;
use core::net::Ipv4Addr;

pub(super) fn matches(operation: Operation, values: &[String], input: &str) -> bool {
    match operation {
        Operation::Exist => values.iter().any(|value| entry_matches(value, input)),
        Operation::NotExist => values.iter().filter(|value| entry_matches(value, input)).count() == 0,
        _ => false,
    }
}

/// A value is either a CIDR block or a bare address compared textually.
fn entry_matches(value: &str, input: &str) -> bool {
    match value.split_once('/') {
        Some((network, bits)) => in_block(network, bits, input),
        None => value == input,
    }
}

fn in_block(network: &str, bits: &str, input: &str) -> bool {
    let (Ok(network), Ok(bits), Ok(address)) = (network.parse::<Ipv4Addr>(), bits.parse::<u32>(), input.parse::<Ipv4Addr>()) else {
        return false;
    };

    if bits > 32 {
        return false;
    }

    let mask = if bits == 0 { 0 } else { u32::MAX << (32 - bits) };
    (u32::from(address) & mask) == (u32::from(network) & mask)
}
