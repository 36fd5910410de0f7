// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard device control for the mesh agent.
//!
//! [`TunnelReconciler`] turns a controller peer list into device state
//! through the [`TunnelDevice`] trait. [`CommandDevice`] drives a real
//! interface with `ip` and `wg`; [`MockDevice`] keeps everything in memory.

pub mod command;
pub mod device;
pub mod error;
pub mod mock;
pub mod reconciler;

pub use command::CommandDevice;
pub use device::{DeviceConfig, PeerConfig, TunnelDevice};
pub use error::{DeviceError, ReconcileError};
pub use mock::{MockCall, MockDevice, MockDeviceState, MockFailure};
pub use reconciler::{ApplyReport, LocalTunnel, TunnelReconciler};
