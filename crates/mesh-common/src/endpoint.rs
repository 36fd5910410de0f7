// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `host:port` endpoint rules.
//!
//! A usable endpoint has a non-empty host and a port in `1..=65535`. IPv6
//! literals must be bracketed (`[2001:db8::1]:51820`).

use std::net::Ipv6Addr;

/// Splits `host:port`, returning `None` when the string is not a usable
/// endpoint.
pub fn parse_endpoint(candidate: &str) -> Option<(&str, u16)> {
	let (host, port) = if let Some(rest) = candidate.strip_prefix('[') {
		let (host, port) = rest.split_once("]:")?;
		host.parse::<Ipv6Addr>().ok()?;
		(host, port)
	} else {
		let (host, port) = candidate.rsplit_once(':')?;
		if !is_hostname(host) {
			return None;
		}
		(host, port)
	};

	if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	match port.parse::<u16>() {
		Ok(0) | Err(_) => None,
		Ok(port) => Some((host, port)),
	}
}

fn is_hostname(host: &str) -> bool {
	!host.is_empty()
		&& host
			.bytes()
			.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
}

pub fn is_valid_endpoint(candidate: &str) -> bool {
	parse_endpoint(candidate).is_some()
}

/// The first candidate that parses, in the order given.
pub fn select_endpoint<S: AsRef<str>>(candidates: &[S]) -> Option<String> {
	candidates
		.iter()
		.map(AsRef::as_ref)
		.find(|c| is_valid_endpoint(c))
		.map(str::to_string)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn accepts_common_forms() {
		assert_eq!(parse_endpoint("203.0.113.5:51820"), Some(("203.0.113.5", 51820)));
		assert_eq!(parse_endpoint("vpn.example.com:443"), Some(("vpn.example.com", 443)));
		assert_eq!(parse_endpoint("[2001:db8::1]:51820"), Some(("2001:db8::1", 51820)));
	}

	#[test]
	fn rejects_malformed() {
		for bad in [
			"",
			"garbage",
			"1.2.3.4",
			":51820",
			"1.2.3.4:",
			"1.2.3.4:0",
			"1.2.3.4:65536",
			"1.2.3.4:+80",
			"2001:db8::1:51820",
			"[not-v6]:51820",
			"host name:80",
		] {
			assert!(parse_endpoint(bad).is_none(), "{bad:?} should be rejected");
		}
	}

	#[test]
	fn selection_skips_invalid_candidates() {
		let candidates = ["garbage", "198.51.100.7:51820", "203.0.113.5:51820"];
		assert_eq!(
			select_endpoint(&candidates),
			Some("198.51.100.7:51820".to_string())
		);
	}

	#[test]
	fn selection_of_nothing_valid_is_none() {
		assert_eq!(select_endpoint::<&str>(&[]), None);
		assert_eq!(select_endpoint(&["x", "y:z"]), None);
	}

	fn candidate() -> impl Strategy<Value = String> {
		prop_oneof![
			(any::<[u8; 4]>(), 1u16..).prop_map(|(o, p)| format!(
				"{}.{}.{}.{}:{p}",
				o[0], o[1], o[2], o[3]
			)),
			"[a-z]{0,6}",
			"[a-z]{1,6}:[0-9]{0,3}x",
		]
	}

	proptest! {
		#[test]
		fn selection_is_first_valid(candidates in proptest::collection::vec(candidate(), 0..8)) {
			let expected = candidates.iter().find(|c| is_valid_endpoint(c)).cloned();
			prop_assert_eq!(select_endpoint(&candidates), expected);
		}

		#[test]
		fn ipv4_with_nonzero_port_always_parses(octets in any::<[u8; 4]>(), port in 1u16..) {
			let endpoint = format!("{}.{}.{}.{}:{port}", octets[0], octets[1], octets[2], octets[3]);
			prop_assert_eq!(parse_endpoint(&endpoint).map(|(_, p)| p), Some(port));
		}
	}
}
