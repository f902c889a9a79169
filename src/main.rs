fn main() {
    if let Err(e) = sph_toon::core::Engine::run() {
        tracing::error!(target: "engine", "Fatal: {}", e);
        eprintln!("Engine failed: {}", e);
        std::process::exit(1);
    }
}
