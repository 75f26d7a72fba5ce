//! Build script for detecting system dependencies and model assets.
//!
//! Checks for OpenCV through pkg-config and reports whether the ONNX models
//! expected by the default configuration are present.

use std::env;
use std::path::Path;
use std::process::Command;

const MODEL_ASSETS: [&str; 2] = ["assets/face_detector.onnx", "assets/head_pose.onnx"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if !pkg_config_available() {
        println!("cargo:warning=pkg-config not found. This is required to find system libraries.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
        println!("cargo:warning=On macOS: brew install pkg-config");
    } else {
        check_opencv();
    }

    check_model_assets();

    println!(
        "cargo:rustc-env=BUILD_TARGET={}",
        env::var("TARGET").unwrap_or_default()
    );
}

fn pkg_config_available() -> bool {
    Command::new("pkg-config")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

fn check_opencv() {
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    let version = ["opencv4", "opencv"].iter().find_map(|name| {
        Command::new("pkg-config")
            .args(["--modversion", name])
            .output()
            .ok()
            .filter(|output| output.status.success())
            .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
    });

    if version.is_none() {
        println!("cargo:warning=OpenCV not found via pkg-config. Make sure OpenCV is installed.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev clang libclang-dev");
        println!("cargo:warning=On macOS: brew install opencv");
    }
}

fn check_model_assets() {
    let root = env::var("CARGO_MANIFEST_DIR").unwrap_or_default();
    for asset in MODEL_ASSETS {
        println!("cargo:rerun-if-changed={asset}");
        if !Path::new(&root).join(asset).exists() {
            println!("cargo:warning=Model {asset} not found; the binary needs it at runtime (see README.md)");
        }
    }
}
