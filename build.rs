use std::process::Command;

/// Embeds `GIT_VERSION` for the startup banner and `--version`.
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let package = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let described = Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty());

    let version = match described {
        Some(git) => format!("{} {}", package, git),
        None => package,
    };

    println!("cargo:rustc-env=GIT_VERSION={}", version);
}
