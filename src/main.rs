//! scenesmith CLI binary
//!
//! All logic is in the library; main.rs only invokes cli::run().

fn main() {
    // cli::run() prints every error itself; main only maps to the process exit
    if let Err(code) = scenesmith::cli::run() {
        std::process::exit(code.as_i32());
    }
}
