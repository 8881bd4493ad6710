use std::env;
use std::path::PathBuf;

/// Copies the generated header here as well when set.
const EXPORT_VAR: &str = "REST_FFI_HEADER_DIR";

fn main() {
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-env-changed={EXPORT_VAR}");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        println!("cargo:warning=skipping C header generation: cargo build env not set");
        return;
    };

    let bindings = match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("REST_FFI_H")
        .generate()
    {
        Ok(bindings) => bindings,
        Err(e) => {
            println!("cargo:warning=skipping C header generation: {e}");
            return;
        }
    };

    bindings.write_to_file(PathBuf::from(out_dir).join("rest_ffi.h"));

    if let Some(dir) = env::var_os(EXPORT_VAR) {
        let dir = PathBuf::from(dir);
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                bindings.write_to_file(dir.join("rest_ffi.h"));
            }
            Err(e) => println!(
                "cargo:warning=cannot create header dir {}: {e}",
                dir.display()
            ),
        }
    }
}
