//! Launch-argument patching.
//!
//! Overridden artifacts are only picked up by the client in developer mode,
//! which in turn needs JVM assertions enabled.

use overlay_registry::Manifest;

/// Flag that separates launcher arguments from client arguments.
pub const CLIENT_ARGS_FLAG: &str = "--clientargs";
/// Flag that enables developer mode in the client.
pub const DEVELOPER_MODE_FLAG: &str = "--developer-mode";
/// Flag that suppresses [`DEVELOPER_MODE_FLAG`].
pub const NO_DEVELOPER_MODE_FLAG: &str = "--no-developer-mode";
/// JVM flag that enables assertions.
pub const ENABLE_ASSERTIONS_FLAG: &str = "-ea";

/// Add the client-args and developer-mode flags to `args` if absent.
///
/// Developer mode is not requested when the caller passed
/// `--no-developer-mode`.
pub fn patch_launch_args(args: &[String]) -> Vec<String> {
    let mut patched = args.to_vec();
    push_absent(&mut patched, CLIENT_ARGS_FLAG);
    if !contains(&patched, NO_DEVELOPER_MODE_FLAG) {
        push_absent(&mut patched, DEVELOPER_MODE_FLAG);
    }
    patched
}

/// Enable assertions in both client JVM argument lists.
pub fn patch_jvm_args(manifest: &mut Manifest) {
    push_absent(&mut manifest.client_jvm_arguments, ENABLE_ASSERTIONS_FLAG);
    push_absent(&mut manifest.client_jvm9_arguments, ENABLE_ASSERTIONS_FLAG);
}

fn contains(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn push_absent(args: &mut Vec<String>, flag: &str) {
    if !contains(args, flag) {
        args.push(flag.to_string());
    }
}
