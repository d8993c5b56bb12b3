use std::process::Command;
use std::str::from_utf8;

fn have_lrat_check() -> bool {
    if let Some(lrat_check) = Command::new("lrat-check").output().ok() {
        let stdout = from_utf8(&lrat_check.stdout).unwrap_or("").to_lowercase();
        let stderr = from_utf8(&lrat_check.stderr).unwrap_or("").to_lowercase();
        return stdout.contains("usage") || stderr.contains("usage");
    }
    false
}

fn main() {
    if have_lrat_check() {
        println!("cargo:rustc-cfg=test_lrat_check");
    } else {
        println!("cargo:warning=lrat-check utility not found, some tests will be disabled");
    }
}
