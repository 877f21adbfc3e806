// Build script that tries to generate the C header with `cbindgen`.
// Without `cbindgen` on PATH it copies the checked-in `include/lull.h`
// to $OUT_DIR instead.
//
// Consumers can include the header from either:
//   - <repo>/lull-ffi/include/lull.h   (checked-in)
//   - $OUT_DIR/lull.h

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/lull.h");

    let (Some(crate_dir), Some(out_dir)) = (env::var_os("CARGO_MANIFEST_DIR"), env::var_os("OUT_DIR")) else {
        return;
    };
    let crate_dir = PathBuf::from(crate_dir);
    let header_repo = crate_dir.join("include").join("lull.h");
    let header_out = PathBuf::from(out_dir).join("lull.h");

    let generated = Command::new("cbindgen")
        .args(["--crate", "lull-ffi", "--lang", "C", "--output"])
        .arg(&header_out)
        .current_dir(&crate_dir)
        .status()
        .is_ok_and(|s| s.success());

    if generated {
        println!("cargo:warning=lull-ffi: generated header with cbindgen -> {}", header_out.display());
        return;
    }

    if let Err(e) = fs::copy(&header_repo, &header_out) {
        println!("cargo:warning=lull-ffi: could not copy include/lull.h to OUT_DIR: {e}");
    }
}
