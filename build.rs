fn main() {
    // ndarray-linalg is built without a LAPACK backend feature on macOS;
    // the eigenvalue solver links against Accelerate there instead.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("macos") {
        println!("cargo:rustc-link-lib=framework=Accelerate");
    }
    println!("cargo:rerun-if-changed=build.rs");
}
