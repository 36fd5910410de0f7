// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory membership for the mesh controller.
//!
//! [`NodeRegistry`] owns every registered node and the [`AddressAllocator`]
//! that hands out their tunnel addresses. State lives for the life of the
//! process.

pub mod allocator;
pub mod error;
pub mod registry;

pub use allocator::AddressAllocator;
pub use error::{RegistryError, Result};
pub use registry::{NodeRecord, NodeRegistry, RegisterNode, Registration, RegistryStats};
