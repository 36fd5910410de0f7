// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{RegistryError, Result};
use ipnet::Ipv4Net;
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Sequential IPv4 allocator over a single block.
///
/// A cursor walks forward from `start_offset`, wrapping back to it at the
/// end of the block. Issued addresses are never returned twice. Every
/// address from `start_offset` to the top of the block is eligible,
/// including the last one (the broadcast address on a LAN). Callers
/// serialize access; the allocator itself is not synchronized.
#[derive(Debug)]
pub struct AddressAllocator {
	network: Ipv4Net,
	base: u32,
	size: u64,
	start_offset: u64,
	cursor: u64,
	issued: HashSet<Ipv4Addr>,
}

impl AddressAllocator {
	pub fn new(network: Ipv4Net, start_offset: u32) -> Result<Self> {
		let network = network.trunc();
		let size = 1u64 << (32 - u32::from(network.prefix_len()));
		let start_offset = u64::from(start_offset);
		if start_offset >= size {
			return Err(RegistryError::InvalidBlock {
				network,
				reason: format!("start offset {start_offset} is outside a block of {size} addresses"),
			});
		}

		Ok(Self {
			network,
			base: u32::from(network.network()),
			size,
			start_offset,
			cursor: start_offset,
			issued: HashSet::new(),
		})
	}

	pub fn network(&self) -> Ipv4Net {
		self.network
	}

	/// Next free address, or `AllocationExhausted` once a full lap of the
	/// block finds nothing.
	pub fn allocate(&mut self) -> Result<Ipv4Addr> {
		for _ in 0..self.capacity() {
			let offset = self.cursor;
			self.cursor += 1;
			if self.cursor >= self.size {
				self.cursor = self.start_offset;
			}

			// offset < size <= 2^32, so the truncation is lossless
			let addr = Ipv4Addr::from(self.base.wrapping_add(offset as u32));
			if !self.network.contains(&addr) || self.issued.contains(&addr) {
				continue;
			}
			self.issued.insert(addr);
			return Ok(addr);
		}

		Err(RegistryError::AllocationExhausted {
			network: self.network,
		})
	}

	/// Whether `addr` has already been handed out.
	pub fn contains(&self, addr: Ipv4Addr) -> bool {
		self.issued.contains(&addr)
	}

	pub fn issued_count(&self) -> u64 {
		self.issued.len() as u64
	}

	/// Addresses this allocator can ever hand out.
	pub fn capacity(&self) -> u64 {
		self.size - self.start_offset
	}
}
