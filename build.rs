fn main() {
    // Rebuild when the build script changes
    println!("cargo:rerun-if-changed=build.rs");

    // Generate build information for the health endpoint and startup log
    built::write_built_file()
        .expect("Failed to acquire build-time information");
}
