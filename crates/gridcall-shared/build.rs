//! Build script for gridcall-shared
//!
//! Compiles the Protocol Buffer definition of the task service. Generated
//! code is output to `$OUT_DIR/gridcall.v1.rs` and included via `include!`
//! macro in `src/proto/mod.rs`.
//!
//! Requires the `protoc` compiler to be installed on the system.

use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let proto_root = manifest_dir.join("proto");

    let proto_files = ["gridcall/v1/task_service.proto"];

    let proto_paths: Vec<PathBuf> = proto_files
        .iter()
        .map(|f| {
            let path = proto_root.join(f);
            if !path.exists() {
                panic!("Proto file not found: {:?}", path);
            }
            path
        })
        .collect();

    if std::env::var_os("PROTOC").is_none() {
        if let Ok(protoc) = protoc_bin_vendored::protoc_bin_path() {
            std::env::set_var("PROTOC", protoc);
        }
    }

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .build_transport(true)
        .emit_rerun_if_changed(true)
        .compile_protos(&proto_paths, std::slice::from_ref(&proto_root))?;

    println!("cargo:rerun-if-changed={}", proto_root.display());

    Ok(())
}
