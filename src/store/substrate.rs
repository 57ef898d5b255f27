// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! Platform-specific substrate management.
//!
//! The store root must sit on a small volatile filesystem so no secret
//! block ever lands on persistent media and a full substrate fails writes
//! fast. On Linux that is a ~1 MiB ramfs mount; on macOS a `hdiutil` RAM
//! device formatted as HFS. Free-space probing is also platform-specific:
//! ramfs reports no size of its own, so Linux reads host free memory, while
//! macOS can ask `df` about the mount directly.

use std::fs::DirBuilder;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

#[cfg(target_os = "macos")]
use super::{CODE_BYTE_SIZE, DEFAULT_MAX_SECRET_SIZE};

/// Free-space margin subtracted before admission decisions.
///
/// Linux ramfs free space is host-wide memory, so the margin is generous.
#[cfg(not(target_os = "macos"))]
pub const DEFAULT_HEADROOM: i64 = 30 * 1024 * 1024;

/// Free-space margin subtracted before admission decisions.
///
/// HFS reports the mount's own blocks, so a few secrets' worth of per-file
/// overhead suffices.
#[cfg(target_os = "macos")]
pub const DEFAULT_HEADROOM: i64 = ((DEFAULT_MAX_SECRET_SIZE + CODE_BYTE_SIZE + 1) * 3) as i64;

fn run(command: &mut Command) -> io::Result<()> {
    let output = command.output()?;
    if output.status.success() {
        return Ok(());
    }
    Err(io::Error::other(format!(
        "{command:?} failed: {}",
        String::from_utf8_lossy(&output.stderr).trim()
    )))
}

/// Mount a ~1 MiB memory-backed filesystem at `root`, force-unmounting any
/// prior mount first. The directory is created 0700 if missing.
#[cfg(not(target_os = "macos"))]
pub fn setup_ram_disk(root: &Path) -> io::Result<()> {
    if run(Command::new("sudo").arg("umount").arg(root)).is_ok() {
        tracing::info!(root = %root.display(), "unmounted previous ramdisk");
    }

    if !root.exists() {
        DirBuilder::new().recursive(true).mode(0o700).create(root)?;
    }

    run(Command::new("sudo")
        .args(["mount", "-t", "ramfs", "-o", "size=1m", "ramfs"])
        .arg(root))?;
    tracing::info!(root = %root.display(), "ramdisk mounted");
    Ok(())
}

/// Unmount the substrate, retrying once after a pause since the mount is
/// sometimes still busy right after the server exits.
#[cfg(not(target_os = "macos"))]
pub fn unmount(root: &Path) -> io::Result<()> {
    if run(Command::new("sudo").arg("umount").arg(root)).is_err() {
        thread::sleep(Duration::from_secs(1));
        run(Command::new("sudo").arg("umount").arg(root))?;
    }
    tracing::info!(root = %root.display(), "ramdisk unmounted");
    Ok(())
}

/// Free substrate bytes. With ramfs this is host free memory, read from
/// `/proc/meminfo`.
#[cfg(not(target_os = "macos"))]
pub fn free_space(_root: &Path) -> io::Result<i64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo")?;
    let free_line = meminfo
        .lines()
        .find(|line| line.starts_with("MemFree:"))
        .ok_or_else(|| io::Error::other("no MemFree line in /proc/meminfo"))?;
    let free_kb: i64 = free_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| io::Error::other("malformed MemFree line"))?
        .parse()
        .map_err(io::Error::other)?;
    Ok(free_kb * 1024)
}

/// Attach a 1 MiB RAM device, format it as HFS, and mount it at `root`.
#[cfg(target_os = "macos")]
pub fn setup_ram_disk(root: &Path) -> io::Result<()> {
    if run(Command::new("umount").arg("-f").arg(root)).is_ok() {
        tracing::info!(root = %root.display(), "unmounted previous ramdisk");
    }

    // ram:// sizes are in 512-byte sectors.
    let output = Command::new("hdiutil")
        .args(["attach", "-nomount", "ram://2048"])
        .output()?;
    if !output.status.success() {
        return Err(io::Error::other(format!(
            "hdiutil attach failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let device = String::from_utf8_lossy(&output.stdout).trim().to_string();
    tracing::info!(device = %device, "created ramdisk device");

    run(Command::new("newfs_hfs").arg(&device))?;

    if !root.exists() {
        DirBuilder::new().recursive(true).mode(0o700).create(root)?;
    }

    run(Command::new("mount").args(["-t", "hfs"]).arg(&device).arg(root))?;
    tracing::info!(root = %root.display(), "ramdisk mounted");
    Ok(())
}

/// Detach the RAM device, retrying once after a pause on resource-busy.
#[cfg(target_os = "macos")]
pub fn unmount(root: &Path) -> io::Result<()> {
    if run(Command::new("hdiutil").args(["detach", "-force"]).arg(root)).is_err() {
        thread::sleep(Duration::from_secs(1));
        run(Command::new("hdiutil").args(["detach", "-force"]).arg(root))?;
    }
    tracing::info!(root = %root.display(), "ramdisk unmounted and ejected");
    Ok(())
}

/// Free substrate bytes, from the Available column of `df` in 512-byte
/// blocks.
#[cfg(target_os = "macos")]
pub fn free_space(root: &Path) -> io::Result<i64> {
    let output = Command::new("df").arg(root).output()?;
    if !output.status.success() {
        return Err(io::Error::other(format!(
            "df failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let data_line = stdout
        .lines()
        .nth(1)
        .ok_or_else(|| io::Error::other("df produced no data line"))?;
    let free_blocks: i64 = data_line
        .split_whitespace()
        .nth(3)
        .ok_or_else(|| io::Error::other("malformed df output"))?
        .parse()
        .map_err(io::Error::other)?;
    Ok(free_blocks * 512)
}
