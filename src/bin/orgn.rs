//! Short binary name (`orgn`) that forwards to the `org_notes` library.

fn main() {
    env_logger::init();
    if let Err(err) = org_notes::entry() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
