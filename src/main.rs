fn main() {
    if let Err(e) = chatbowl::cli::main() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
