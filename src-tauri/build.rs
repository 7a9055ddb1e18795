use std::process::Command;

fn main() {
    // Capture git commit hash at build time for the startup log
    let git_hash = get_git_commit_hash();
    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", git_hash);
    println!("cargo:rerun-if-changed=.git/HEAD");

    tauri_build::build();
}

fn get_git_commit_hash() -> String {
    match Command::new("git").args(["rev-parse", "--short=7", "HEAD"]).output() {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        // Fallback for CI or non-git environments
        _ => env!("CARGO_PKG_VERSION").to_string(),
    }
}
