fn main() -> std::io::Result<()> {
    prost_build::Config::new()
        .compile_protos(&["proto/game.proto", "proto/companion.proto"], &["proto/"])
}
