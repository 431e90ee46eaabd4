use std::env;
use std::fs;
use std::path::PathBuf;

// Writes `compiled_features.rs` into OUT_DIR for `info::info()`.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    let Some(out) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        println!("cargo:warning=OUT_DIR not set; skipping feature list");
        return;
    };
    let mut features: Vec<String> = env::vars()
        .filter_map(|(k, _)| k.strip_prefix("CARGO_FEATURE_").map(|n| n.to_ascii_lowercase().replace('_', "-")))
        .collect();
    features.sort();
    let quoted: Vec<String> = features.iter().map(|f| format!("{f:?}")).collect();
    let content = format!("pub static COMPILED_FEATURES: &[&str] = &[{}];\n", quoted.join(", "));
    if let Err(e) = fs::write(out.join("compiled_features.rs"), content) {
        panic!("write compiled_features.rs: {e}");
    }
}
