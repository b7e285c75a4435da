use std::env;
use std::fs;
use std::path::PathBuf;

use prost::Message;

const PROTO_ROOT: &str = "proto";
const PROTOS: &[&str] = &["proto/user/v1/user.proto"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    for proto in PROTOS {
        println!("cargo:rerun-if-changed={proto}");
    }

    // protox compiles in-process, so no system protoc is required.
    let file_descriptors = protox::compile(PROTOS, [PROTO_ROOT])?;
    let descriptor_path =
        PathBuf::from(env::var_os("OUT_DIR").ok_or("OUT_DIR not set")?).join("user_descriptor.bin");
    fs::write(&descriptor_path, file_descriptors.encode_to_vec())?;

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(&descriptor_path)
        .skip_protoc_run()
        .compile_protos(PROTOS, &[PROTO_ROOT])?;
    Ok(())
}
