//! Spawning helper tools without disturbing the GUI.

use std::ffi::OsStr;

use tokio::process::Command;

/// Builds a command for running a helper tool behind the GUI.
pub fn command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    cmd.kill_on_drop(true);
    configure_for_background(&mut cmd);
    cmd
}

/// Detaches the child from any console so no window flashes up.
#[cfg(windows)]
fn configure_for_background(cmd: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

/// Nothing to do off Windows; children already run without a console.
#[cfg(not(windows))]
fn configure_for_background(_cmd: &mut Command) {}
