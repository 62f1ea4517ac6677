// build.rs

fn main() {
    // Link the scanout and rendering stack. pkg-config is authoritative
    // when it works; otherwise fall back to plain linker flags and
    // standard search paths.
    let libraries = ["libdrm", "gbm", "egl", "gl"];

    let mut pkg_config_success = true;

    for lib in &libraries {
        if pkg_config::probe_library(lib).is_err() {
            eprintln!(
                "pkg-config failed for library '{}'. Falling back to manual linking.",
                lib
            );
            pkg_config_success = false;
            break;
        }
    }

    if !pkg_config_success {
        // Assumes the development libraries live in a standard location;
        // non-standard installs can extend the search via LIBRARY_PATH.
        println!("cargo:rustc-link-lib=drm");
        println!("cargo:rustc-link-lib=gbm");
        println!("cargo:rustc-link-lib=EGL");
        println!("cargo:rustc-link-lib=GL");

        println!("cargo:rustc-link-search=/usr/lib");

        eprintln!(
            "Manual linking flags applied. Ensure libdrm, gbm, EGL, and GL development libraries are installed."
        );
    } else {
        // pkg-config already emitted the link flags for each probe.
        eprintln!("pkg-config successfully found libraries. Linking configured automatically.");
    }
}
