#![forbid(unsafe_code)]

fn main() {
    if let Err(error) = tabkit::run_from_env() {
        eprintln!("tabkit: {error}");
        std::process::exit(error.exit_code());
    }
}
