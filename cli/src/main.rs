//! Binary entrypoint for lslbuild

fn main() {
    if let Err(err) = lslbuild_cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(lslbuild_cli::exit_code_for(&err));
    }
}
