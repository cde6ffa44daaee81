fn main() {
    env_logger::init();
    if let Err(err) = org_notes::entry() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
