//! Build script for the `api-shared` crate.
//!
//! ## Purpose
//! Generates Rust protobuf types, the `Ehr` server trait and the `Ehr` client from `ehr.proto`,
//! and emits a file-descriptor set.
//!
//! ## Intended use
//! The generated server is implemented by `api-grpc`; the generated client is used by the REST
//! gateway and the CLI. The descriptor set is used for gRPC reflection.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let proto_file = std::path::Path::new(manifest_dir).join("ehr.proto");
    let proto_include_root = std::path::Path::new(manifest_dir);

    println!("cargo:rerun-if-changed={}", proto_file.display());
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(
            std::path::Path::new(&std::env::var("OUT_DIR")?).join("proto_descriptor.bin"),
        )
        .compile_protos(std::slice::from_ref(&proto_file), &[proto_include_root])?;

    Ok(())
}
