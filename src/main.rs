fn main() {
    if let Err(e) = paintrack_lib::run() {
        eprintln!("paintrack: {e}");
        std::process::exit(1);
    }
}
