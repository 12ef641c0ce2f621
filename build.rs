use std::{
    env,
    fs::File,
    io::{self, prelude::*},
    path::PathBuf,
    process::Command,
};

fn main() -> Result<(), Error> {
    copy_memory_config()?;
    set_version_info();

    println!("cargo:rerun-if-changed=build.rs");

    Ok(())
}

/// Make `memory.x` available to the linker
fn copy_memory_config() -> Result<(), Error> {
    let out_dir = env::var("OUT_DIR")?;
    let out_dir = PathBuf::from(out_dir);

    let memory_x = if cfg!(feature = "high-density") {
        include_bytes!("memory_high.x").as_ref()
    } else {
        include_bytes!("memory_medium.x").as_ref()
    };

    File::create(out_dir.join("memory.x"))?.write_all(memory_x)?;

    // Tell Cargo where to find the file.
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory_medium.x");
    println!("cargo:rerun-if-changed=memory_high.x");

    Ok(())
}

/// Sets `CP_CARGO` to the crate version and `CP_GIT` to the current commit for the boot banner
fn set_version_info() {
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=CP_CARGO={}", env!("CARGO_PKG_VERSION"));
    println!("cargo:rustc-env=CP_GIT={}", git_hash);
}

#[derive(Debug)]
enum Error {
    Env(env::VarError),
    Io(io::Error),
}

impl From<env::VarError> for Error {
    fn from(error: env::VarError) -> Self {
        Self::Env(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}
