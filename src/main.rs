fn main() {
    env_logger::init();
    std::process::exit(keyway::cli::run());
}
