// パス: build.rs
// 役割: feature `giac-native` 有効時に C シム（native/giac_c.cpp）をビルドし libgiac をリンクする
// 意図: ヘッダ・ライブラリの場所を環境変数で差し替えられるようにし、組み込みバックエンドのみのビルドには何もしない
// 関連ファイル: native/giac_c.cpp, native/giac_c.h, src/engine/native.rs, Cargo.toml

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=GIAC_LIB_DIR");
    println!("cargo:rerun-if-env-changed=GIAC_INCLUDE_DIR");
    println!("cargo:rerun-if-env-changed=GIAC_LIB_NAME");
    if env::var_os("CARGO_FEATURE_GIAC_NATIVE").is_none() {
        return;
    }
    if let Some(dir) = env::var_os("GIAC_LIB_DIR") {
        let dir = PathBuf::from(dir);
        println!("cargo:rustc-link-search=native={}", dir.display());
    }
    match env::var("GIAC_LIB_NAME") {
        // ビルド済みのシムを使う
        Ok(shim) => println!("cargo:rustc-link-lib={shim}"),
        Err(_) => build_shim(),
    }
    println!("cargo:rustc-link-lib=giac");
    println!("cargo:rustc-link-lib=gmp");
}

#[cfg(feature = "giac-native")]
fn build_shim() {
    println!("cargo:rerun-if-changed=native/giac_c.cpp");
    println!("cargo:rerun-if-changed=native/giac_c.h");
    let mut build = cc::Build::new();
    build
        .cpp(true)
        .file("native/giac_c.cpp")
        .include("native")
        .flag_if_supported("-std=c++14")
        .warnings(false);
    if let Some(dir) = env::var_os("GIAC_INCLUDE_DIR") {
        build.include(PathBuf::from(dir));
    }
    build.compile("giac_c");
}

#[cfg(not(feature = "giac-native"))]
fn build_shim() {}
