use std::{env, path::Path, process::Command, str::from_utf8};

/// Output of a successful command run, if any.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|result| result.status.success())
        .and_then(|result| from_utf8(&result.stdout).ok().map(|out| out.trim().to_owned()))
}

fn main() {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_owned());
    let package_version = env::var("CARGO_PKG_VERSION").unwrap();

    let git_version = if Path::new("../.git").exists() {
        command_output(
            "git",
            &["describe", "--tags", "--match=v[0-9]*", "--dirty=-d", "--always"],
        )
    } else {
        None
    };

    let version = match git_version {
        Some(version) => version.trim_start_matches('v').to_owned(),
        None => package_version,
    };

    let rustc_version =
        command_output(&rustc, &["--version"]).unwrap_or_else(|| "unknown rustc".to_owned());

    println!("cargo:rustc-env=BDDSAT_VERSION={}", version);
    println!("cargo:rustc-env=BDDSAT_RUSTC_VERSION={}", rustc_version);
    println!(
        "cargo:rustc-env=BDDSAT_PROFILE={}",
        env::var("PROFILE").unwrap()
    );
}
