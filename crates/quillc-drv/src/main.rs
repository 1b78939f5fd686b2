use clap::Parser;

fn main() {
    let cli = quillc_drv::Cli::parse();
    if let Err(err) = quillc_drv::run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
