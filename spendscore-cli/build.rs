use std::process::Command;

/// Embed the short git sha into `--version`; "unknown" outside a checkout.
fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let workspace = format!("{manifest_dir}/..");

    let sha = Command::new("git")
        .args(["-C", &workspace, "rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rerun-if-changed={workspace}/.git/HEAD");
    println!("cargo:rustc-env=SPENDSCORE_BUILD_SHA={sha}");
}
