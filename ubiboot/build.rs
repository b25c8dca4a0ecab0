//! UBIBoot Build Script
//!
//! Hands the linker script to the linker when building the loader for a
//! bare-metal MIPS target. Host builds (tests, docs) link normally.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=link.ld");

    let target = env::var("TARGET").unwrap_or_default();
    if !target.starts_with("mips") || !target.ends_with("-none") {
        return;
    }

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
    let script = manifest_dir.join("link.ld");
    println!("cargo:rustc-link-arg-bins=-T{}", script.display());
    println!("cargo:rustc-link-arg-bins=--gc-sections");

    let profile = env::var("PROFILE").unwrap_or_else(|_| "debug".to_string());
    println!("cargo:warning=Building UBIBoot for {target} ({profile})");
}
