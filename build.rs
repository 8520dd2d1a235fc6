// Generates the user service messages and client from the protobuf contract

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/user_service.proto");
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile(&["proto/user_service.proto"], &["proto"])?;
    Ok(())
}
