#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use tokimun::{Error, compile};

/// Compile, panicking with the input on failure.
pub fn lua(input: &str) -> String {
    compile(input).unwrap_or_else(|e| panic!("compile failed: {e}\n--- input ---\n{input}"))
}

/// Compile input that must be rejected.
pub fn compile_err(input: &str) -> Error {
    match compile(input) {
        Ok(output) => panic!("expected an error, got:\n{output}"),
        Err(e) => e,
    }
}

fn supports_goto(interpreter: &Path) -> bool {
    Command::new(interpreter)
        .args(["-e", "goto done ::done::"])
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Set to make a missing interpreter fail the run instead of skipping.
const REQUIRE_LUA: &str = "TOKIMUN_REQUIRE_LUA";

/// First Lua interpreter on `PATH` that understands `goto`.
///
/// When none is found the skip is reported once on the process's real
/// stderr, which the test harness does not capture.
pub fn interpreter() -> Option<&'static Path> {
    static FOUND: OnceLock<Option<PathBuf>> = OnceLock::new();
    FOUND
        .get_or_init(|| {
            let found = ["lua", "luajit", "lua5.4", "lua5.3", "lua5.2"]
                .iter()
                .filter_map(|name| which::which(name).ok())
                .find(|path| supports_goto(path));
            if found.is_none() {
                assert!(
                    std::env::var_os(REQUIRE_LUA).is_none(),
                    "{REQUIRE_LUA} is set but no Lua interpreter with goto support is on PATH"
                );
                let _ = writeln!(
                    std::io::stderr(),
                    "warning: no Lua interpreter with goto support on PATH; \
                     e2e tests only check that their sources compile \
                     (set {REQUIRE_LUA}=1 to fail instead)"
                );
            }
            found
        })
        .as_deref()
}

/// Compile and execute `input`, returning its stdout, or `None` when
/// no suitable interpreter is installed.
pub fn run(input: &str) -> Option<String> {
    let interpreter = interpreter()?;

    let generated = lua(input);
    let mut script = tempfile::Builder::new()
        .prefix("tokimun-test-")
        .suffix(".lua")
        .tempfile()
        .expect("create temp script");
    script
        .write_all(generated.as_bytes())
        .expect("write temp script");

    let output = Command::new(interpreter)
        .arg(script.path())
        .output()
        .expect("spawn interpreter");
    assert!(
        output.status.success(),
        "lua failed:\n{}\n--- generated ---\n{generated}",
        String::from_utf8_lossy(&output.stderr)
    );
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}
