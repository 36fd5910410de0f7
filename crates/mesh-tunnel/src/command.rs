// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument, trace, warn};

use crate::device::{DeviceConfig, TunnelDevice};
use crate::error::{DeviceError, Result};

const IP_FALLBACKS: &[&str] = &["/usr/sbin/ip", "/sbin/ip", "/usr/bin/ip"];
const WG_FALLBACKS: &[&str] = &["/usr/bin/wg", "/usr/sbin/wg", "/usr/local/bin/wg"];

/// Drives a WireGuard interface through iproute2 (`ip`) and wireguard-tools
/// (`wg`). Needs `CAP_NET_ADMIN`.
#[derive(Debug, Clone)]
pub struct CommandDevice {
	iface: String,
	ip: Tool,
	wg: Tool,
}

#[derive(Debug, Clone)]
struct Tool {
	name: &'static str,
	path: PathBuf,
}

impl Tool {
	fn locate(name: &'static str, fallbacks: &[&str]) -> Self {
		Self {
			name,
			path: locate_binary(name, fallbacks),
		}
	}
}

/// Prefers `PATH`, then well-known sbin locations that are often missing
/// from service `PATH`s. Falls back to the bare name so the spawn error
/// names the tool.
fn locate_binary(name: &str, fallbacks: &[&str]) -> PathBuf {
	let from_path = std::env::var_os("PATH").and_then(|paths| {
		std::env::split_paths(&paths)
			.map(|dir| dir.join(name))
			.find(|candidate| candidate.is_file())
	});

	from_path
		.or_else(|| {
			fallbacks
				.iter()
				.map(PathBuf::from)
				.find(|candidate| candidate.is_file())
		})
		.unwrap_or_else(|| PathBuf::from(name))
}

impl CommandDevice {
	pub fn new(iface: impl Into<String>) -> Self {
		Self {
			iface: iface.into(),
			ip: Tool::locate("ip", IP_FALLBACKS),
			wg: Tool::locate("wg", WG_FALLBACKS),
		}
	}

	async fn ip(&self, args: &[&str]) -> Result<String> {
		run(&self.ip, args, None).await
	}
}

#[async_trait]
impl TunnelDevice for CommandDevice {
	fn name(&self) -> &str {
		&self.iface
	}

	#[instrument(skip(self), fields(iface = %self.iface))]
	async fn ensure_device(&self) -> Result<()> {
		if self.ip(&["link", "show", "dev", &self.iface]).await.is_err() {
			info!("creating wireguard interface");
			self
				.ip(&["link", "add", &self.iface, "type", "wireguard"])
				.await?;
		}
		self.ip(&["link", "set", "dev", &self.iface, "up"]).await?;
		Ok(())
	}

	#[instrument(skip(self), fields(iface = %self.iface))]
	async fn ensure_address_and_route(&self, address: Ipv4Addr, network: Ipv4Net) -> Result<()> {
		let wanted = format!("{address}/32");
		let shown = self
			.ip(&["-4", "-o", "addr", "show", "dev", &self.iface])
			.await?;
		let current = parse_inet_addrs(&shown);

		if current != [wanted.as_str()] {
			if !current.is_empty() {
				debug!(?current, "flushing stale addresses");
				self.ip(&["-4", "addr", "flush", "dev", &self.iface]).await?;
			}
			info!(address = %wanted, "assigning tunnel address");
			self
				.ip(&["-4", "addr", "add", &wanted, "dev", &self.iface])
				.await?;
		}

		let network = network.to_string();
		let routes = self
			.ip(&["-4", "route", "show", "dev", &self.iface])
			.await?;
		if !route_present(&routes, &network) {
			match self
				.ip(&["-4", "route", "add", &network, "dev", &self.iface])
				.await
			{
				Ok(_) => info!(%network, "added mesh route"),
				Err(DeviceError::CommandFailed { stderr, .. }) if stderr.contains("File exists") => {
					debug!(%network, "route already present");
				}
				Err(e) => return Err(e),
			}
		}

		Ok(())
	}

	#[instrument(skip(self, config), fields(iface = %self.iface, peers = config.peers.len()))]
	async fn configure_device(&self, config: &DeviceConfig) -> Result<()> {
		let rendered = config.render();
		run(
			&self.wg,
			&["syncconf", &self.iface, "/dev/stdin"],
			Some(rendered.expose().as_bytes()),
		)
		.await?;
		debug!("peer configuration synced");
		Ok(())
	}
}

async fn run(tool: &Tool, args: &[&str], stdin: Option<&[u8]>) -> Result<String> {
	trace!(cmd = %format!("{} {}", tool.name, args.join(" ")), "running command");

	let mut cmd = Command::new(&tool.path);
	cmd.args(args)
		.stdin(if stdin.is_some() {
			Stdio::piped()
		} else {
			Stdio::null()
		})
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);

	let mut child = cmd.spawn().map_err(|e| spawn_error(tool, &tool.path, e))?;

	if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
		pipe.write_all(input).await?;
		pipe.shutdown().await?;
	}

	let output = child.wait_with_output().await?;
	if output.status.success() {
		Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
	} else {
		let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
		Err(DeviceError::CommandFailed {
			program: tool.name,
			args: args.join(" "),
			stderr,
		})
	}
}

fn spawn_error(tool: &Tool, path: &Path, e: std::io::Error) -> DeviceError {
	if e.kind() == std::io::ErrorKind::NotFound {
		warn!(path = %path.display(), "{} not found", tool.name);
		DeviceError::ToolMissing { program: tool.name }
	} else {
		DeviceError::Io(e)
	}
}

/// Extracts `a.b.c.d/len` tokens from `ip -4 -o addr show` output.
fn parse_inet_addrs(output: &str) -> Vec<&str> {
	output
		.lines()
		.filter_map(|line| {
			let mut tokens = line.split_whitespace();
			tokens.find(|t| *t == "inet")?;
			tokens.next()
		})
		.collect()
}

/// Whether `ip route show` output has a line whose destination is `network`.
fn route_present(output: &str, network: &str) -> bool {
	output
		.lines()
		.any(|line| line.split_whitespace().next() == Some(network))
}
