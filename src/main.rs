fn main() {
    if let Err(err) = strconv::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
