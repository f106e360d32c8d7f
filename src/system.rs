use std::path::Path;
use std::process::Command;

use tracing::warn;

use crate::error::Result;

/// Opens `folder` in the platform file manager without waiting for it
pub fn open_folder(folder: &Path) -> Result<()> {
    #[cfg(target_os = "windows")]
    let program = "explorer";
    #[cfg(target_os = "macos")]
    let program = "open";
    #[cfg(all(unix, not(target_os = "macos")))]
    let program = "xdg-open";

    Command::new(program).arg(folder).spawn()?;
    Ok(())
}

/// Powers the machine off once the queue has drained, when the user asked for it
pub fn initiate_shutdown() -> Result<()> {
    warn!("initiating system shutdown");
    #[cfg(target_os = "windows")]
    Command::new("shutdown").args(["/s", "/t", "1"]).spawn()?;
    #[cfg(not(target_os = "windows"))]
    Command::new("sudo").args(["shutdown", "-h", "now"]).spawn()?;
    Ok(())
}
