use std::env;
use std::path::PathBuf;

fn main() {
    env::set_var("PROTOC", protobuf_src::protoc());

    tonic_build::configure()
        .build_server(false)
        .compile(
            &["proto/com/terraquantum/channel/v1alpha1/channel.proto"],
            &[PathBuf::from("proto"), protobuf_src::include()],
        )
        .unwrap();
}
