//! Regenerates `include/truthmark.h` from the `extern "C"` surface.

use std::env;
use std::path::PathBuf;

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").map(PathBuf::from).unwrap_or_default();
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let mut config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("TRUTHMARK_H".to_string()),
        cpp_compat: true,
        ..Default::default()
    };
    config.enumeration.prefix_with_name = true;

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(crate_dir.join("include").join("truthmark.h"));
        }
        Err(err) => println!("cargo:warning=skipping header generation: {err}"),
    }
}
